//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Storage (DuckDB with vss, in-memory)
//! - Embeddings and chat completions (OpenAI-compatible HTTP, offline mock)
//! - Sources (Todoist)
//!
//! plus the outer surfaces in [`api`]: the DI container, CLI router and HTTP server.

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
