//! Hybrid account allocation for sales teams.
//!
//! Accounts are split between agents in two phases: an equitable share dealt
//! evenly by count, then a ranking share weighted towards the best performers.
//! Rotations release part of the book and re-run the same allocation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
