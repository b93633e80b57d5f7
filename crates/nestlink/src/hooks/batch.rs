use crate::error::LinkResult;
use futures_util::future::try_join_all;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Run `op` once per item, concurrently, failing on the first error.
///
/// Completion order is unspecified. On failure the remaining in-flight
/// operations are dropped; writes that already finished stay applied.
pub(crate) async fn run_batch<T, F, Fut>(items: Vec<T>, limit: Option<usize>, op: F) -> LinkResult<()>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = LinkResult<()>>,
{
    match (items.len(), limit) {
        (0, _) => Ok(()),
        (_, None) => try_join_all(items.into_iter().map(op)).await.map(drop),
        (_, Some(limit)) => {
            stream::iter(items)
                .map(op)
                .buffer_unordered(limit.max(1))
                .try_collect::<Vec<()>>()
                .await
                .map(drop)
        }
    }
}
