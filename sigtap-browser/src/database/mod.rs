//! Database abstraction layer
//!
//! This module provides a database-agnostic interface for table discovery
//! and filtered, paginated row retrieval.

pub mod statement;
pub mod traits;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the main trait
pub use traits::DatabaseProvider;
