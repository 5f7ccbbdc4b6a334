//! Storage layer: one DuckDB database holding the rule catalog, documents,
//! action items, and audit records.

mod duck;
mod error;
mod remediation;
mod rows;

pub use duck::DuckStore;
pub use error::StoreError;
