//! DTO module
//!
//! Request and response bodies of the HTTP API.

pub mod function_dto;
pub mod rest_dto;

pub use function_dto::*;
pub use rest_dto::*;
