//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    cerca_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in ["profile", "service_request", "open_request", "review_prompt"] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    cerca_db::run_migrations(&db).await.unwrap();
    cerca_db::run_migrations(&db).await.unwrap();
}
