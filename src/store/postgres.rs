use super::{NewUser, Role, StoreError, User, UserStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

// SQLSTATE unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the connection pool.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Create the `users` table and its unique email index if missing.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(info_span!(
                "db.migrate",
                db.system = "postgresql",
                db.operation = "CREATE"
            ))
            .await
            .context("Failed to apply users schema")?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, email, password, role FROM users WHERE email = $1 LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .instrument(info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        ))
        .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user();

        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password, role) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .instrument(info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        ))
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate),
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await?;

        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await?;

        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        role: role.parse::<Role>()?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.as_ref() == UNIQUE_VIOLATION),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::PostgresTestDb;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError { code: None }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$digestdigestdigestdigestdigestdigestdigestdigestdig".to_string(),
        }
    }

    async fn count_rows(store: &PgUserStore, email: &str) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&store.pool)
            .await?;
        Ok(count)
    }

    #[tokio::test]
    async fn schema_bootstrap_is_idempotent() -> anyhow::Result<()> {
        let Ok(db) = PostgresTestDb::start().await else {
            return Ok(());
        };
        let store = db.store();

        // start() already applied it once
        store.ensure_schema().await?;

        let indexed: Option<String> = sqlx::query_scalar(
            "SELECT indexdef FROM pg_indexes WHERE tablename = 'users' AND indexname = 'users_email_key'",
        )
        .fetch_optional(&store.pool)
        .await?;
        let indexed = indexed.context("unique email index missing")?;
        assert!(indexed.contains("UNIQUE"), "unexpected index: {indexed}");

        store.ping().await?;
        Ok(())
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() -> anyhow::Result<()> {
        let Ok(db) = PostgresTestDb::start().await else {
            return Ok(());
        };
        let store = db.store();

        let inserted = store.insert(new_user("alice", "a@x.com")).await?;
        assert_eq!(inserted.role, Role::User);

        let found = store
            .find_by_email("a@x.com")
            .await?
            .context("user should exist")?;
        assert_eq!(found, inserted);

        let role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(inserted.id)
            .fetch_one(&store.pool)
            .await?;
        assert_eq!(role, "user");

        assert!(store.find_by_email("A@x.com").await?.is_none());
        assert!(store.find_by_email("nobody@x.com").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected_by_index() -> anyhow::Result<()> {
        let Ok(db) = PostgresTestDb::start().await else {
            return Ok(());
        };
        let store = db.store();

        store.insert(new_user("alice", "a@x.com")).await?;
        let result = store.insert(new_user("alice2", "a@x.com")).await;

        assert!(matches!(result, Err(StoreError::Duplicate)), "{result:?}");
        assert_eq!(count_rows(&store, "a@x.com").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_inserts_leave_one_row() -> anyhow::Result<()> {
        let Ok(db) = PostgresTestDb::start().await else {
            return Ok(());
        };
        let store = db.store();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(new_user(&format!("user{i}"), "race@x.com")).await
            }));
        }

        let mut inserted = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await? {
                Ok(_) => inserted += 1,
                Err(StoreError::Duplicate) => duplicates += 1,
                Err(err) => return Err(err.into()),
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(count_rows(&store, "race@x.com").await?, 1);
        Ok(())
    }

    #[test]
    fn schema_declares_unique_email_index() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(SCHEMA_SQL.contains("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)"));
    }
}
