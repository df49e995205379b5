//! Domain layer - Pure business logic.

pub mod video;
