//! Ashcam Core Library
//!
//! Configuration and logging shared by the `ashcam` binary.

pub mod colored_logger;
pub mod config;
