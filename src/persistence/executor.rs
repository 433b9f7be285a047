//! Read-only execution of model-generated SQL against the embedded store.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Row as _, Statement, TypeInfo, ValueRef};
use tracing::debug;

use crate::models::query::Row;
use crate::{AppError, Result};

use super::db::Database;

/// Executes SQL text and returns the resulting rows.
///
/// Every failure is reported as [`AppError::Query`] carrying the database
/// diagnostic, so callers can feed it back to a model unchanged.
pub trait QueryExecutor: Send + Sync {
    /// Run `sql` and collect every returned row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Query`] if the text is empty or holds more than
    /// one statement, or if the statement fails to prepare or execute, or
    /// does not return data.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Row>>> + Send + 'a>>;
}

/// [`QueryExecutor`] backed by the shared `SQLite` pool.
#[derive(Clone)]
pub struct SqliteExecutor {
    db: Arc<Database>,
}

impl SqliteExecutor {
    /// Create an executor over `db`.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl QueryExecutor for SqliteExecutor {
    fn execute<'a>(
        &'a self,
        sql: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Row>>> + Send + 'a>> {
        Box::pin(execute_sql(&self.db, sql))
    }
}

async fn execute_sql(pool: &Database, sql: &str) -> Result<Vec<Row>> {
    if sql.trim().is_empty() {
        return Err(AppError::Query(
            "the supplied SQL string contains no statements".into(),
        ));
    }

    if has_trailing_statement(sql)? {
        return Err(AppError::Query(
            "the supplied SQL string contains more than one statement".into(),
        ));
    }

    let statement = pool.prepare(sql).await.map_err(query_error)?;
    if statement.columns().is_empty() {
        return Err(AppError::Query("this statement does not return data".into()));
    }

    let rows = sqlx::query(sql).fetch_all(pool).await.map_err(query_error)?;
    debug!(rows = rows.len(), "query executed");
    rows.iter().map(row_to_record).collect()
}

/// Whether anything other than comments or separators follows the first
/// statement terminator.
fn has_trailing_statement(sql: &str) -> Result<bool> {
    let tokens = Tokenizer::new(&SQLiteDialect {}, sql)
        .tokenize()
        .map_err(|err| AppError::Query(err.to_string()))?;

    Ok(tokens
        .iter()
        .skip_while(|token| !matches!(token, Token::SemiColon))
        .any(|token| !matches!(token, Token::SemiColon | Token::Whitespace(_) | Token::EOF)))
}

fn query_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(db_err) => AppError::Query(db_err.message().to_owned()),
        other => AppError::Query(other.to_string()),
    }
}

fn row_to_record(row: &SqliteRow) -> Result<Row> {
    let mut record = Row::new();
    for column in row.columns() {
        let value = decode_value(row, column.ordinal())?;
        record.insert(column.name().to_owned(), value);
    }
    Ok(record)
}

/// Decode by the value's storage class rather than the declared column type.
fn decode_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index).map_err(query_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(
            row.try_get_unchecked::<i64, _>(index)
                .map_err(query_error)?,
        ),
        "REAL" | "NUMERIC" => {
            let number = row
                .try_get_unchecked::<f64, _>(index)
                .map_err(query_error)?;
            serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
        }
        "BLOB" => Value::from(
            row.try_get_unchecked::<Vec<u8>, _>(index)
                .map_err(query_error)?,
        ),
        _ => Value::String(
            row.try_get_unchecked::<String, _>(index)
                .map_err(query_error)?,
        ),
    };
    Ok(value)
}
