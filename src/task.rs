use crate::error::{ErrorKind, Result};
use exn::ResultExt;

/// Run CPU-bound codec work off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.or_raise(|| ErrorKind::Task)
}
