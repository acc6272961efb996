//! # Domain Layer
//!
//! Core models and the error taxonomy shared by every layer.
//! This layer performs no I/O and is independent of external services.

mod error;
pub mod models;

pub use error::*;
pub use models::*;
