use std::future::Future;

use tokio_util::sync::CancellationToken;

use repokit_core::storage::{RepositoryError, Result};

/// Runs `future` until it completes or `token` fires, whichever comes first.
///
/// A fired token wins over a ready future and yields
/// [`RepositoryError::Cancelled`]. The abandoned future is dropped, so staged
/// but uncommitted work is simply not committed.
pub async fn cancellable<F, V>(token: &CancellationToken, future: F) -> Result<V>
where
    F: Future<Output = Result<V>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(RepositoryError::Cancelled),
        result = future => result,
    }
}

/// Extension for attaching a cancellation token to repository futures.
pub trait Cancellable<V>: Future<Output = Result<V>> + Sized {
    fn with_cancellation(self, token: CancellationToken) -> impl Future<Output = Result<V>> {
        async move { cancellable(&token, self).await }
    }
}

impl<F, V> Cancellable<V> for F where F: Future<Output = Result<V>> {}
