use ethc_api::error::LedgerError;
use log::{debug, error, warn};
use tokio::time::Duration;

const MAX_RETRIES: u32 = 5;
const INITIAL_BACKOFF: u64 = 200;
const TIMEOUT: Duration = Duration::from_secs(8);

/// Errors that can tell whether repeating the same request may succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for LedgerError {
    fn is_transient(&self) -> bool {
        LedgerError::is_transient(self)
    }
}

/// Retries a read-only operation with exponential backoff while it fails transiently.
///
/// Meant for callers of the miner; never wrap signing or broadcasting in it.
pub async fn retry_transient<F, Fut, T, E>(operation: &str, f: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Transient + From<LedgerError> + std::fmt::Display,
{
    let mut backoff = Duration::from_millis(INITIAL_BACKOFF);

    for attempt in 0..MAX_RETRIES {
        let last = attempt == MAX_RETRIES - 1;
        match tokio::time::timeout(TIMEOUT, f()).await {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(e)) if !e.is_transient() => return Err(e),
            Ok(Err(e)) if last => {
                error!("{} attempt {} failed: {}", operation, attempt + 1, e);
                return Err(e);
            }
            Err(_) if last => {
                error!("{} attempt {} timed out after {:?}", operation, attempt + 1, TIMEOUT);
                return Err(LedgerError::transient(operation, format!("timed out after {:?}", TIMEOUT)).into());
            }
            Ok(Err(e)) => warn!("{} attempt {} failed, retrying: {}", operation, attempt + 1, e),
            Err(_) => warn!("{} attempt {} timed out, retrying", operation, attempt + 1),
        }

        debug!("Waiting for backoff: {:?}", backoff);
        tokio::time::sleep(backoff).await;
        backoff *= 2;
    }

    Err(LedgerError::transient(operation, "all retry attempts failed").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u64, LedgerError> = retry_transient("blockNumber", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LedgerError::transient("blockNumber", "connection reset"))
            } else {
                Ok(9)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_on_non_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<u64, LedgerError> = retry_transient("minersOfBlock", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::invariant("minersOfBlock", "short list"))
        })
        .await;

        assert!(matches!(result, Err(LedgerError::InvariantViolation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
