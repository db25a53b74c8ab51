//! Application layer orchestrating domain logic and infrastructure.

pub mod locate;
pub mod prompt;
pub mod review;
pub mod session;
pub mod state;
