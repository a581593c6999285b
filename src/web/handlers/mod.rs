//! HTTP request handlers, organized by functional area.

pub mod jobs;
pub mod orders;
