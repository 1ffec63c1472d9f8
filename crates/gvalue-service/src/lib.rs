//! HTTP surface and process wiring for the g-value prediction service

pub mod api;
pub mod backend;
pub mod config;
