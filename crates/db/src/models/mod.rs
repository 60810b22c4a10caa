//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the DTOs the pipeline and API exchange.

pub mod page;
pub mod status;
pub mod story;
