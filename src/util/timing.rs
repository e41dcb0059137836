use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Run an async operation and log how long it took.
///
/// `trace_log_fn` renders a short summary of a successful result into the log line.
pub async fn measure_dur_async<F, Fut, T, E>(
    metric_name: &str,
    operation: F,
    trace_log_fn: Option<fn(&T) -> String>,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let (result, dur) = timed(operation()).await;
    let log_line = match &result {
        Ok(r) => trace_log_fn.map(|f| f(r)).unwrap_or_default(),
        Err(_) => "failed".to_string(),
    };
    debug!("{} | {}, took={}", metric_name, log_line, dur.as_millis());
    result
}

/// Await a future and return its output with the elapsed wall time.
pub async fn timed<Fut: Future>(future: Fut) -> (Fut::Output, Duration) {
    let start = Instant::now();
    let output = future.await;
    (output, start.elapsed())
}
