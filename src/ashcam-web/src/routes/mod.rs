//! HTTP route handlers

pub mod api;
pub mod navigation;

pub use api::*;
pub use navigation::*;
