//! Database and schema tests
//!
//! Tests SQLite migrations, entity storage, and ownership-scoped queries.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Setup test database with migrations
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

async fn insert_todo(pool: &SqlitePool, user_id: &str, title: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO todos (user_id, title, completed, created_at, updated_at) \
         VALUES (?, ?, 0, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(title)
    .bind(Utc::now())
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .unwrap();

    row.0
}

#[tokio::test]
async fn test_database_migrations_work() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table'")
            .fetch_all(&pool)
            .await
            .unwrap();

    let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
    for expected in ["users", "todos", "conversations", "messages"] {
        assert!(names.contains(&expected), "missing table {expected}");
    }
}

#[tokio::test]
async fn test_todo_ids_are_sequential() {
    let pool = setup_test_db().await;

    let first = insert_todo(&pool, "alice", "first").await;
    let second = insert_todo(&pool, "alice", "second").await;

    assert!(second > first);
}

#[tokio::test]
async fn test_combined_owner_filter_hides_foreign_todos() {
    let pool = setup_test_db().await;

    let todo_id = insert_todo(&pool, "alice", "private").await;

    // The exact query shape production uses: id and owner in one filter.
    let as_owner: Option<(String,)> =
        sqlx::query_as("SELECT title FROM todos WHERE id = ? AND user_id = ?")
            .bind(todo_id)
            .bind("alice")
            .fetch_optional(&pool)
            .await
            .unwrap();

    let as_other: Option<(String,)> =
        sqlx::query_as("SELECT title FROM todos WHERE id = ? AND user_id = ?")
            .bind(todo_id)
            .bind("bob")
            .fetch_optional(&pool)
            .await
            .unwrap();

    assert_eq!(as_owner.unwrap().0, "private");
    assert!(as_other.is_none());
}

#[tokio::test]
async fn test_message_role_storage() {
    let pool = setup_test_db().await;

    let conversation_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO conversations (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(conversation_id)
    .bind("alice")
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    for role in ["user", "assistant", "system", "tool"] {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, timestamp) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(role)
        .bind(format!("{role} message"))
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
    }

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
        .bind(conversation_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(count.0, 4);
}

#[tokio::test]
async fn test_conversation_cascade_delete() {
    let pool = setup_test_db().await;

    let conversation_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO conversations (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(conversation_id)
    .bind("alice")
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO messages (id, conversation_id, role, content, timestamp) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind("user")
    .bind("Test")
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM conversations WHERE id = ?")
        .bind(conversation_id)
        .execute(&pool)
        .await
        .unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
        .bind(conversation_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn test_duplicate_email_rejected_by_schema() {
    let pool = setup_test_db().await;

    let insert = "INSERT INTO users (id, email, password_hash, created_at, updated_at) \
                  VALUES (?, ?, ?, ?, ?)";

    sqlx::query(insert)
        .bind(Uuid::new_v4())
        .bind("alice@example.com")
        .bind("$argon2id$fake")
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    let duplicate = sqlx::query(insert)
        .bind(Uuid::new_v4())
        .bind("alice@example.com")
        .bind("$argon2id$fake")
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&pool)
        .await;

    assert!(duplicate.is_err());
}
