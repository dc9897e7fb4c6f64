//! PharmaConnect Brasil
//!
//! Backend of a B2B marketplace for the Brazilian pharmaceutical industry:
//! AI assistant functions, a knowledge base with retrieval, a handoff queue
//! between agents, table resources and realtime notifications.

pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
pub mod websocket;
