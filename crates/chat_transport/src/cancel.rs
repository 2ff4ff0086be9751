use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;

/// Shared cooperative cancellation flag for one send.
pub type CancelSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Creates a fresh, unset cancellation flag.
#[must_use]
pub fn cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

pub fn is_cancelled(cancel: &CancelSignal) -> bool {
    cancel.load(Ordering::Acquire)
}

/// Drives `future` to completion unless `cancel` is raised first.
///
/// The future is dropped on cancellation, which lets the HTTP layer abandon the
/// socket instead of waiting for the next chunk.
pub async fn await_or_cancel<F>(
    future: F,
    cancel: &CancelSignal,
) -> Result<F::Output, TransportError>
where
    F: Future,
{
    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancel) {
            return Err(TransportError::Aborted);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancel) {
                return Err(TransportError::Aborted);
            }
            return Ok(output);
        }
    }
}
