use crate::storage::error::StorageResult;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry a read-only operation while it fails with a transient error.
///
/// Backoff doubles from 100ms and is capped at 2^10 times that.
/// Non-transient errors (not found, access denied, ...) are returned immediately.
pub async fn retry_with_max_retries<F, Fut, T>(
    max_retries: usize,
    operation_name: &str,
    mut operation: F,
) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < max_retries => {
                warn!(
                    "Retryable error in {} (attempt {}/{}): {}",
                    operation_name,
                    attempt + 1,
                    max_retries,
                    e
                );

                // 100ms, 200ms, 400ms, 800ms, ...
                let backoff_ms = 100 * (1u64 << attempt.min(10));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::error::StorageError;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let result = retry_with_max_retries(3, "list", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_transient_errors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_max_retries(5, "list", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StorageError::Transient("connection reset".to_string()))
                } else {
                    Ok(100)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 100);
        // 2 failures + 1 success
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_io_timeout_is_transient() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_max_retries(3, "list", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err(StorageError::IoError(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "slow disk",
                    )))
                } else {
                    Ok(200)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_retry_access_denied_not_retried() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: StorageResult<i32> = retry_with_max_retries(5, "list", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::AccessDenied("docs".to_string()))
            }
        })
        .await;

        assert!(result.unwrap_err().is_access_denied());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_max_retries_exceeded() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: StorageResult<i32> = retry_with_max_retries(3, "list", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Transient("503 Slow Down".to_string()))
            }
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        // max_retries + 1 attempts
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_zero_max_retries() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: StorageResult<i32> = retry_with_max_retries(0, "list", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Transient("timed out".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exponential_backoff() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let start = std::time::Instant::now();

        let result = retry_with_max_retries(2, "list", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StorageError::Transient("timed out".to_string()))
                } else {
                    Ok(400)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 400);
        // 100ms + 200ms of backoff
        assert!(start.elapsed().as_millis() >= 250);
    }
}
