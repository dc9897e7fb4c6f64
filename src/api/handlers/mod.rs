//! Handlers module
//!
//! HTTP request handlers.

pub mod function_handler;
pub mod rest_handler;
