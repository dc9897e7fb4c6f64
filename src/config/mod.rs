//! Configuration
//!
//! Typed application configuration loaded from a TOML file with
//! `PHARMA_`-prefixed environment overrides.

pub mod config;
pub mod loader;
