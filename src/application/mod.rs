//! Application services - Generic over the ports.

pub mod intake;
pub mod registry;
