use crate::{ActionError, ActionResult};
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> ActionResult<()> {
    if cancel.is_cancelled() {
        Err(ActionError::Cancelled)
    } else {
        Ok(())
    }
}

/// Drive `future` until it completes or `cancel` fires.
///
/// A result that arrives after cancellation is discarded.
pub(crate) async fn run_cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = ActionResult<T>>,
) -> ActionResult<T> {
    ensure_not_cancelled(cancel)?;
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ActionError::Cancelled),
        result = future => result,
    };
    ensure_not_cancelled(cancel)?;
    result
}
