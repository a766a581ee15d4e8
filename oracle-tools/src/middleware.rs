//! Composable wrappers around a capability's handler
//!
//! A middleware takes the next handler and returns a new one. [`Tool`] folds
//! its middleware list around the core handler once, so the first middleware
//! added sits innermost and the last added sees the call first.
//!
//! [`Tool`]: crate::Tool

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use oracle_core::OracleError;
use tracing::{debug, info, warn};

use crate::metrics::MetricsCollector;
use crate::tool::{make_handler, Handler, ToolResult};

/// A decorator over an invocation handler
pub trait Middleware: Send + Sync {
    fn wrap(&self, tool: &str, next: Handler) -> Handler;
}

impl<F> Middleware for F
where
    F: Fn(&str, Handler) -> Handler + Send + Sync,
{
    fn wrap(&self, tool: &str, next: Handler) -> Handler {
        self(tool, next)
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Logs input and output through `tracing` and onto the result
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging;

impl Middleware for Logging {
    fn wrap(&self, tool: &str, next: Handler) -> Handler {
        let tool = tool.to_string();
        make_handler(move |invocation, cancel| {
            let next = Arc::clone(&next);
            let tool = tool.clone();
            async move {
                let call_id = invocation.call_id.clone();
                debug!(
                    tool = %tool,
                    call_id = %call_id,
                    args = ?invocation.args,
                    input = ?invocation.input,
                    "Invoking tool"
                );

                let mut result = next(invocation, cancel).await;

                match &result.error {
                    None => {
                        info!(tool = %tool, call_id = %call_id, duration = ?result.duration, "Tool succeeded");
                        debug!(tool = %tool, call_id = %call_id, data = ?result.data, "Tool output");
                        result.log(format!("{tool}: ok"));
                    }
                    Some(err) => {
                        warn!(tool = %tool, call_id = %call_id, error = %err, "Tool failed");
                        result.log(format!("{tool}: {err}"));
                    }
                }
                result
            }
            .boxed()
        })
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Records wall-clock time spent below this point on the result
#[derive(Debug, Clone, Copy, Default)]
pub struct Timing;

impl Middleware for Timing {
    fn wrap(&self, tool: &str, next: Handler) -> Handler {
        let tool = tool.to_string();
        make_handler(move |invocation, cancel| {
            let next = Arc::clone(&next);
            let tool = tool.clone();
            async move {
                let started = Instant::now();
                let mut result = next(invocation, cancel).await;
                result.duration = started.elapsed();
                result.log(format!("{tool} took {:?}", result.duration));
                result
            }
            .boxed()
        })
    }
}

// ============================================================================
// Timeout
// ============================================================================

/// Hard wall-clock limit on the wrapped handler.
///
/// The handler runs on its own task with a child cancellation token. When the
/// deadline fires the caller gets a timeout failure straight away and the
/// child token is cancelled so the detached task can stop early.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    pub limit: Duration,
}

impl Timeout {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl Middleware for Timeout {
    fn wrap(&self, tool: &str, next: Handler) -> Handler {
        let tool = tool.to_string();
        let limit = self.limit;
        make_handler(move |invocation, cancel| {
            let next = Arc::clone(&next);
            let tool = tool.clone();
            async move {
                let call_id = invocation.call_id.clone();
                let child = cancel.child_token();
                let task = tokio::spawn(next(invocation, child.clone()));

                tokio::select! {
                    joined = task => match joined {
                        Ok(result) => result,
                        Err(err) if err.is_panic() => ToolResult::failure(
                            call_id,
                            OracleError::execution(format!(
                                "{tool} panicked: {}",
                                panic_message(err.into_panic())
                            )),
                        ),
                        Err(err) => ToolResult::failure(
                            call_id,
                            OracleError::execution(format!("{tool} task failed: {err}")),
                        ),
                    },
                    _ = tokio::time::sleep(limit) => {
                        child.cancel();
                        warn!(tool = %tool, call_id = %call_id, ?limit, "Tool timed out, abandoning task");
                        ToolResult::failure(call_id, OracleError::timeout(tool, limit))
                    }
                    _ = cancel.cancelled() => ToolResult::failure(
                        call_id,
                        OracleError::cancelled(format!("{tool} cancelled by caller")),
                    ),
                }
            }
            .boxed()
        })
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Re-runs failed invocations with a fixed delay.
///
/// Validation failures and caller cancellation are returned as-is.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Retry {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

impl Middleware for Retry {
    fn wrap(&self, tool: &str, next: Handler) -> Handler {
        let tool = tool.to_string();
        let Retry { max_retries, delay } = *self;
        make_handler(move |invocation, cancel| {
            let next = Arc::clone(&next);
            let tool = tool.clone();
            async move {
                let mut logs = Vec::new();
                let mut attempt: u32 = 0;

                loop {
                    if cancel.is_cancelled() {
                        let mut result = ToolResult::failure(
                            invocation.call_id.clone(),
                            OracleError::cancelled(format!("{tool} cancelled before attempt {}", attempt + 1)),
                        );
                        logs.append(&mut result.logs);
                        result.logs = logs;
                        return result;
                    }
                    attempt += 1;

                    let mut result = next(invocation.clone(), cancel.clone()).await;
                    let retry = match &result.error {
                        Some(err) if err.is_retryable() && attempt <= max_retries => {
                            warn!(tool = %tool, attempt, error = %err, "Tool attempt failed, retrying in {:?}", delay);
                            Some(format!("attempt {attempt} failed: {err}"))
                        }
                        _ => None,
                    };

                    let Some(line) = retry else {
                        if attempt > 1 {
                            result.log(format!("{tool}: finished after {attempt} attempts"));
                        }
                        logs.append(&mut result.logs);
                        result.logs = logs;
                        return result;
                    };

                    logs.append(&mut result.logs);
                    logs.push(line);

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
            }
            .boxed()
        })
    }
}

// ============================================================================
// Panic recovery
// ============================================================================

/// Turns a panic inside the wrapped handler into an execution failure
#[derive(Debug, Clone, Copy, Default)]
pub struct Recover;

impl Middleware for Recover {
    fn wrap(&self, tool: &str, next: Handler) -> Handler {
        let tool = tool.to_string();
        make_handler(move |invocation, cancel| {
            let call_id = invocation.call_id.clone();
            let tool = tool.clone();

            let future = match std::panic::catch_unwind(AssertUnwindSafe(|| next(invocation, cancel))) {
                Ok(future) => future,
                Err(panic) => {
                    let result = recovered(&tool, call_id, panic);
                    return async move { result }.boxed();
                }
            };

            async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => recovered(&tool, call_id, panic),
                }
            }
            .boxed()
        })
    }
}

fn recovered(tool: &str, call_id: String, panic: Box<dyn Any + Send>) -> ToolResult {
    let message = panic_message(panic);
    warn!(tool = %tool, call_id = %call_id, panic = %message, "Recovered from tool panic");
    ToolResult::failure(call_id, OracleError::execution(format!("{tool} panicked: {message}")))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Feeds per-tool counters into a shared collector
#[derive(Debug, Clone)]
pub struct Metrics {
    collector: Arc<MetricsCollector>,
}

impl Metrics {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl Middleware for Metrics {
    fn wrap(&self, tool: &str, next: Handler) -> Handler {
        let tool = tool.to_string();
        let collector = Arc::clone(&self.collector);
        make_handler(move |invocation, cancel| {
            let next = Arc::clone(&next);
            let tool = tool.clone();
            let collector = Arc::clone(&collector);
            async move {
                let started = Instant::now();
                let result = next(invocation, cancel).await;
                collector.record(&tool, started.elapsed(), !result.is_ok());
                result
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Invocation, Tool};
    use oracle_core::ValidationError;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_util::sync::CancellationToken;

    fn flaky(failures: u32, attempts: Arc<AtomicU32>) -> Tool {
        Tool::free_text("flaky", "Fails a few times", move |_, _| {
            let attempts = Arc::clone(&attempts);
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(OracleError::execution(format!("failure {n}")))
                } else {
                    Ok(json!(n))
                }
            }
        })
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let tool = flaky(2, Arc::clone(&attempts)).with_middleware(Retry::new(3, Duration::from_millis(5)));

        let result = tool
            .execute(Invocation::with_input("go"), CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(result.data, Some(json!(3)));
        assert!(result.logs.iter().any(|l| l.contains("attempt 1 failed")));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_bound() {
        let attempts = Arc::new(AtomicU32::new(0));
        let tool = flaky(10, Arc::clone(&attempts)).with_middleware(Retry::new(2, Duration::from_millis(1)));

        let result = tool
            .execute(Invocation::with_input("go"), CancellationToken::new())
            .await;

        assert!(!result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_skips_validation_errors() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let tool = Tool::free_text("strict", "Always rejects", move |_, _| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ValidationError::new("input", "bad").into())
            }
        })
        .with_middleware(Retry::new(5, Duration::from_millis(1)));

        let result = tool
            .execute(Invocation::with_input("x"), CancellationToken::new())
            .await;

        assert!(result.error.unwrap().is_validation());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_stops_when_cancelled() {
        let attempts = Arc::new(AtomicU32::new(0));
        let tool = flaky(10, Arc::clone(&attempts)).with_middleware(Retry::new(5, Duration::from_secs(30)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = tool.execute(Invocation::with_input("go"), cancel).await;

        assert!(result.error.unwrap().is_cancelled());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_returns_promptly_and_signals_task() {
        let abandoned = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&abandoned);
        let tool = Tool::free_text("slow", "Sleeps", move |_, cancel: CancellationToken| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(10)) => Ok(json!("late")),
                    _ = cancel.cancelled() => {
                        flag.store(1, Ordering::SeqCst);
                        Err(OracleError::cancelled("abandoned"))
                    }
                }
            }
        })
        .with_middleware(Timeout::new(Duration::from_millis(50)));

        let started = Instant::now();
        let result = tool
            .execute(Invocation::with_input("go"), CancellationToken::new())
            .await;
        let elapsed = started.elapsed();

        assert!(result.error.unwrap().is_timeout());
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(abandoned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_passes_fast_results_through() {
        let tool = Tool::free_text("fast", "", |text, _| async move { Ok(json!(text)) })
            .with_middleware(Timeout::new(Duration::from_secs(1)));
        let result = tool
            .execute(Invocation::with_input("ok"), CancellationToken::new())
            .await;
        assert_eq!(result.into_result().unwrap(), json!("ok"));
    }

    #[tokio::test]
    async fn test_recover_converts_panic() {
        let tool = Tool::free_text("boom", "Panics", |_, _| async move {
            if true {
                panic!("kaboom");
            }
            Ok(json!(null))
        })
        .with_middleware(Recover);

        let result = tool
            .execute(Invocation::with_input("x"), CancellationToken::new())
            .await;

        match result.error {
            Some(OracleError::Execution(msg)) => assert!(msg.contains("kaboom")),
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_metrics_counts_calls_and_errors() {
        let collector = Arc::new(MetricsCollector::new());
        let attempts = Arc::new(AtomicU32::new(0));
        let tool = flaky(1, attempts).with_middleware(Metrics::new(Arc::clone(&collector)));

        for _ in 0..3 {
            tool.execute(Invocation::with_input("x"), CancellationToken::new())
                .await;
        }

        let snapshot = collector.snapshot("flaky").unwrap();
        assert_eq!(snapshot.invocations, 3);
        assert_eq!(snapshot.errors, 1);
        assert!(snapshot.last_invocation.is_some());
    }

    #[tokio::test]
    async fn test_middleware_order_innermost_first() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let tag = |label: &'static str, order: Arc<parking_lot::Mutex<Vec<&'static str>>>| {
            move |_: &str, next: Handler| -> Handler {
                let order = Arc::clone(&order);
                make_handler(move |invocation, cancel| {
                    order.lock().push(label);
                    next(invocation, cancel)
                })
            }
        };

        let tool = Tool::free_text("ordered", "", |_, _| async { Ok(json!(null)) })
            .with_middleware(tag("first", Arc::clone(&order)))
            .with_middleware(tag("second", Arc::clone(&order)));

        tool.execute(Invocation::with_input("x"), CancellationToken::new())
            .await;

        assert_eq!(*order.lock(), vec!["second", "first"]);
    }
}
