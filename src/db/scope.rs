//! Scoped connection acquisition.

use std::backtrace::Backtrace;

use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use super::{BackendKind, Connection, ConnectionOpener};
use crate::error::Result;

/// Opens a connection, runs `f` on it and closes it again.
///
/// The connection is released exactly once on every path. When `f` fails,
/// any pending transaction is rolled back, the error is logged with a full
/// stack trace (captured regardless of `RUST_BACKTRACE`), the connection is closed, and the original error is returned
/// unchanged. A panic inside `f` drops the connection, which closes the
/// underlying socket or file handle.
///
/// ```ignore
/// let table = with_connection(&opener, kind, |conn| {
///     Box::pin(async move { conn.fetch_all(&query).await })
/// })
/// .await?;
/// ```
pub async fn with_connection<T, F>(
    opener: &dyn ConnectionOpener,
    kind: BackendKind,
    f: F,
) -> Result<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut dyn Connection) -> BoxFuture<'c, Result<T>> + Send,
{
    let mut conn = match opener.open(kind).await {
        Ok(conn) => conn,
        Err(e) => {
            error!(backend = %kind, "An error occurred: {e}\n{}", Backtrace::force_capture());
            return Err(e);
        }
    };

    let result = f(conn.as_mut()).await;

    match result {
        Ok(value) => {
            conn.close().await?;
            Ok(value)
        }
        Err(e) => {
            error!(backend = %kind, "An error occurred: {e}\n{}", Backtrace::force_capture());

            if let Err(rollback_err) = conn.rollback().await {
                debug!("Rollback after failure did not apply: {rollback_err}");
            }
            if let Err(close_err) = conn.close().await {
                warn!("Failed to close {kind} connection after error: {close_err}");
            }
            Err(e)
        }
    }
}
