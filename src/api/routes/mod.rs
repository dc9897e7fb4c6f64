//! Routes module
//!
//! API route tables.

pub mod function_routes;
pub mod rest_routes;
