//! Resolved query model returned to callers of the resolver.

use serde::{Deserialize, Serialize};

/// One result row: column name to JSON value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Outcome of a successful natural-language resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// SQL text that executed successfully.
    pub query: String,
    /// Number of attempts taken, between 1 and the attempt ceiling.
    pub attempts: u32,
    /// Rows returned by executing `query`.
    pub result: Vec<Row>,
}
