//! Rows seeded by `fixtures/inventory.sql` for database-backed tests

use shared::Actor;
use sqlx::PgPool;
use uuid::Uuid;

pub const CLERK_ID: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);
/// Quantity 9, minimum 2
pub const PAPER_ID: Uuid = Uuid::from_u128(0x22222222_2222_2222_2222_222222222221);
/// Quantity 40, minimum 5
pub const KNIT_ID: Uuid = Uuid::from_u128(0x22222222_2222_2222_2222_222222222222);
/// Quantity a few units short of `i32::MAX`
pub const TRANSFER_ID: Uuid = Uuid::from_u128(0x22222222_2222_2222_2222_222222222223);
pub const SUPPLIER_ID: Uuid = Uuid::from_u128(0x33333333_3333_3333_3333_333333333333);

pub fn clerk() -> Actor {
    Actor {
        id: CLERK_ID,
        username: "estoquista".to_string(),
    }
}

pub async fn quantity_of(pool: &PgPool, product_id: Uuid) -> sqlx::Result<i32> {
    sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
}

pub async fn count_rows(pool: &PgPool, sql: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar(sql).fetch_one(pool).await
}
