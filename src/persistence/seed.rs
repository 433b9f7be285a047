//! Deterministic demo data for the dashboard tables.

use sqlx::SqlitePool;
use tracing::info;

use crate::Result;

const USERS: [(i64, &str, &str, &str); 3] = [
    (1, "Ada Lovelace", "ada@example.com", "2024-01-04T09:00:00Z"),
    (2, "Grace Hopper", "grace@example.com", "2024-02-11T14:30:00Z"),
    (3, "Alan Turing", "alan@example.com", "2024-03-19T08:15:00Z"),
];

const PRODUCTS: [(i64, &str, &str, f64); 4] = [
    (1, "Notebook", "stationery", 4.5),
    (2, "Desk Lamp", "furniture", 32.0),
    (3, "Headphones", "electronics", 89.9),
    (4, "Coffee Beans", "grocery", 12.25),
];

const ORDERS: [(i64, i64, &str, &str); 5] = [
    (1, 1, "paid", "2024-04-02T10:00:00Z"),
    (2, 2, "shipped", "2024-04-15T16:20:00Z"),
    (3, 1, "paid", "2024-05-03T11:45:00Z"),
    (4, 3, "cancelled", "2024-05-20T09:10:00Z"),
    (5, 2, "pending", "2024-06-01T18:05:00Z"),
];

const ORDER_ENTRIES: [(i64, i64, i64, i64, f64); 8] = [
    (1, 1, 1, 3, 4.5),
    (2, 1, 4, 1, 12.25),
    (3, 2, 3, 1, 89.9),
    (4, 3, 2, 1, 32.0),
    (5, 3, 1, 2, 4.5),
    (6, 4, 3, 1, 89.9),
    (7, 5, 4, 2, 12.25),
    (8, 5, 2, 1, 32.0),
];

/// Insert the demo data set unless `Product` already holds rows.
///
/// Returns `true` when rows were inserted.
///
/// # Errors
///
/// Returns `AppError::Db` if any insert fails; the transaction is rolled back.
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<bool> {
    let existing: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "Product""#)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!(existing, "demo data already present, skipping seed");
        return Ok(false);
    }

    let mut tx = pool.begin().await?;

    for (id, name, email, created_at) in USERS {
        sqlx::query(r#"INSERT INTO "User" ("id", "name", "email", "createdAt") VALUES (?1, ?2, ?3, ?4)"#)
            .bind(id)
            .bind(name)
            .bind(email)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
    }

    for (id, name, category, price) in PRODUCTS {
        sqlx::query(
            r#"INSERT INTO "Product" ("id", "name", "category", "price") VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(id)
        .bind(name)
        .bind(category)
        .bind(price)
        .execute(&mut *tx)
        .await?;
    }

    for (id, user_id, status, created_at) in ORDERS {
        sqlx::query(
            r#"INSERT INTO "Order" ("id", "userId", "status", "createdAt") VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(status)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    }

    for (id, order_id, product_id, quantity, unit_price) in ORDER_ENTRIES {
        sqlx::query(
            r#"INSERT INTO "OrderEntry" ("id", "orderId", "productId", "quantity", "unitPrice")
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(id)
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(
        users = USERS.len(),
        products = PRODUCTS.len(),
        orders = ORDERS.len(),
        "demo data seeded"
    );
    Ok(true)
}
