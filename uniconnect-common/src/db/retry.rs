//! Database Retry Logic
//!
//! Exponential backoff for SQLite busy/locked errors. Contention that outlasts
//! the retry budget is surfaced as [`Error::Conflict`], never swallowed.

use std::time::{Duration, Instant};

use crate::{Error, Result};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Retry a database operation with exponential backoff until `max_wait_ms` elapses.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If it failed on lock contention:
///    a. If time elapsed < max_wait_ms: log WARN, backoff, retry
///    b. Otherwise: log ERROR, return `Error::Conflict`
/// 4. If other error: return error immediately (no retry)
///
/// Backoff starts at 10ms and doubles per attempt, capped at 1000ms.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(
                operation = operation_name,
                attempt,
                "Retrying database operation"
            );
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_lock_contention() => return Err(err),
            Err(err) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        error = %err,
                        "Database operation failed: max retry time exceeded"
                    );
                    return Err(Error::Conflict(format!(
                        "{}: database locked after {} attempts ({} ms elapsed, max {} ms)",
                        operation_name,
                        attempt,
                        elapsed.as_millis(),
                        max_wait_ms
                    )));
                }

                let sleep_ms = backoff_ms.min(MAX_BACKOFF_MS);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    backoff_ms = sleep_ms,
                    "Database locked, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::{init_database, DatabaseOptions};
    use sqlx::SqlitePool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn locked_test_pool(dir: &TempDir) -> SqlitePool {
        let options = DatabaseOptions {
            busy_timeout_ms: 0,
            max_connections: 4,
        };
        init_database(&dir.path().join("retry.db"), &options).await.unwrap()
    }

    async fn insert_tag(pool: &SqlitePool, name: &str) -> Result<()> {
        sqlx::query("INSERT INTO tags (guid, name) VALUES (?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(name)
            .execute(pool)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_on_lock("test_op", 5000, || async { Ok::<i32, Error>(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_lock_error_fails_immediately() {
        let attempts = AtomicUsize::new(0);

        let result = retry_on_lock("test_op", 5000, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, Error>(Error::Internal("other error".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::Internal(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lock_held_past_budget_becomes_conflict() {
        let dir = TempDir::new().unwrap();
        let pool = locked_test_pool(&dir).await;

        let mut holder = pool.acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *holder).await.unwrap();

        let attempts = AtomicUsize::new(0);
        let result = retry_on_lock("insert tag", 100, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            insert_tag(&pool, "music")
        })
        .await;

        sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();

        assert!(matches!(result, Err(Error::Conflict(_))), "got {:?}", result);
        assert!(attempts.load(Ordering::SeqCst) > 1, "lock error was not retried");
    }

    #[tokio::test]
    async fn test_lock_released_within_budget_succeeds() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(locked_test_pool(&dir).await);

        let mut holder = pool.acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *holder).await.unwrap();

        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
        });

        let result = retry_on_lock("insert tag", 5000, || insert_tag(&pool, "art")).await;
        releaser.await.unwrap();

        assert!(result.is_ok(), "got {:?}", result);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name = 'art'")
            .fetch_one(&*pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
