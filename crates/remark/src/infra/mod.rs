//! Infrastructure adapters for configuration, logging, and the Gemini API.

pub mod config;
pub mod gemini;
pub mod logging;
