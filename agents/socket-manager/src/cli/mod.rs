//! CLI support module
//!
//! Configuration file handling and log subscriber setup for the binary.

pub mod config;
pub mod logging;
