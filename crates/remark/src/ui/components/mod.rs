//! Collection of reusable TUI components.

pub mod folder_prompt;
pub mod summary;
