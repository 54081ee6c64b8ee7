//! CLI commands for the hedging agent.

pub mod hedge;

pub use hedge::HedgeArgs;
