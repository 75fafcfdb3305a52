//! Bounded, cancellable calls to external collaborators.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::{PipelineError, Result};

/// Fail with a cancellation error if `cancel` has fired.
pub fn ensure_active(phase: &str, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled {
            phase: phase.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Await `call` for at most `timeout_ms`, aborting early on cancellation.
///
/// Cancellation wins over a result that becomes ready at the same time.
pub async fn call_external<T, F>(
    phase: &str,
    operation: &str,
    timeout_ms: u64,
    cancel: &CancellationToken,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    ensure_active(phase, cancel)?;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled {
            phase: phase.to_string(),
        }),
        result = tokio::time::timeout(Duration::from_millis(timeout_ms), call) => match result {
            Ok(inner) => inner,
            Err(_) => Err(PipelineError::Timeout {
                operation: operation.to_string(),
                after_ms: timeout_ms,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_external_passes_result_through() {
        let token = CancellationToken::new();
        let value = call_external("codegen", "generate", 1_000, &token, async { Ok(5) })
            .await
            .expect("call");
        assert_eq!(value, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_external_times_out() {
        let token = CancellationToken::new();
        let result: Result<()> = call_external("codegen", "generate hero", 50, &token, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(PipelineError::Timeout { after_ms: 50, .. })
        ));
    }

    #[tokio::test]
    async fn test_call_external_observes_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<()> =
            call_external("intelligence", "rank", 1_000, &token, async { Ok(()) }).await;
        assert!(result.expect_err("cancelled").is_cancellation());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_call() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });
        let result: Result<()> = call_external("intelligence", "rank", 60_000, &token, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        assert!(result.expect_err("cancelled").is_cancellation());
    }
}
