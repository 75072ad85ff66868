//! Connection-failure classification and single-retry policy for the SQL
//! backends.
//!
//! Pool connections are acquired per operation (acquire → use → release), so
//! a stale or dropped connection cannot wedge later operations. An operation
//! that hits a connection-level failure reacquires and retries exactly once;
//! a second failure surfaces to the caller.

use std::future::Future;

/// True for failures of the connection itself, as opposed to the statement.
pub(crate) fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Runs `op`, retrying once on a connection-level failure.
pub(crate) async fn with_retry<T, F, Fut>(op: F) -> Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    match op().await {
        Err(e) if is_connection_error(&e) => {
            tracing::warn!(error = %e, "checkpoint connection failed; retrying once");
            op().await
        }
        other => other,
    }
}
