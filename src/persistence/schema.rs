//! Financial dashboard schema bootstrap and introspection.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` and are safe to
//! re-run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the dashboard table definitions to the connected database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r#"
CREATE TABLE IF NOT EXISTS "User" (
    "id"          INTEGER PRIMARY KEY NOT NULL,
    "name"        TEXT NOT NULL,
    "email"       TEXT NOT NULL UNIQUE,
    "createdAt"   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "Product" (
    "id"          INTEGER PRIMARY KEY NOT NULL,
    "name"        TEXT NOT NULL,
    "category"    TEXT NOT NULL,
    "price"       REAL NOT NULL CHECK("price" >= 0)
);

CREATE TABLE IF NOT EXISTS "Order" (
    "id"          INTEGER PRIMARY KEY NOT NULL,
    "userId"      INTEGER NOT NULL REFERENCES "User"("id"),
    "status"      TEXT NOT NULL CHECK("status" IN ('pending','paid','shipped','cancelled')),
    "createdAt"   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "OrderEntry" (
    "id"          INTEGER PRIMARY KEY NOT NULL,
    "orderId"     INTEGER NOT NULL REFERENCES "Order"("id"),
    "productId"   INTEGER NOT NULL REFERENCES "Product"("id"),
    "quantity"    INTEGER NOT NULL CHECK("quantity" > 0),
    "unitPrice"   REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_order_user ON "Order"("userId");
CREATE INDEX IF NOT EXISTS idx_order_entry_order ON "OrderEntry"("orderId");
"#;

    sqlx::query(ddl).execute(pool).await?;
    Ok(())
}

/// Concatenated `CREATE TABLE` text for `tables`, separated by blank lines.
///
/// Tables missing from the database are skipped; entries with no stored
/// SQL contribute an empty string.
///
/// # Errors
///
/// Returns `AppError::Db` if the catalog query fails.
pub async fn sql_schema(pool: &SqlitePool, tables: &[String]) -> Result<String> {
    if tables.is_empty() {
        return Ok(String::new());
    }

    let placeholders = (1..=tables.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name IN ({placeholders})"
    );

    let mut query = sqlx::query_scalar::<_, Option<String>>(&sql);
    for table in tables {
        query = query.bind(table);
    }

    let statements = query.fetch_all(pool).await?;
    Ok(statements
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>()
        .join("\n\n"))
}
