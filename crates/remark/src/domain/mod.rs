//! Domain types shared by the review pipeline and its front ends.

pub mod errors;
pub mod model;
