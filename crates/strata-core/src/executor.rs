//! Settle-all batch execution with a hard concurrency cap.
//!
//! At most `max_concurrent` tasks are in flight at once; a failing task
//! never cancels its siblings. Every task settles and contributes exactly
//! one [`ActionResult`].

use crate::report::ActionResult;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Boxed action future for batches whose tasks are built from heterogeneous
/// async blocks.
pub type BoxedActionFuture = Pin<Box<dyn Future<Output = ActionResult> + Send + 'static>>;

/// One unit of batch work. Account and region are carried alongside the
/// future so the executor can fill the task's result slot even if the
/// future panics.
pub struct BatchTask<F> {
    pub account: String,
    pub region: String,
    pub future: F,
}

impl<F> BatchTask<F> {
    pub fn new(account: impl Into<String>, region: impl Into<String>, future: F) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            future,
        }
    }
}

/// Run `tasks` with at most `max_concurrent` in flight, waiting for every
/// task to settle. Results come back in submission order regardless of
/// completion order.
///
/// `max_concurrent` is deliberately a required parameter: the right bound
/// depends on the downstream service's rate limits and only the caller
/// knows them.
pub async fn run_batch<F>(tasks: Vec<BatchTask<F>>, max_concurrent: usize) -> Vec<ActionResult>
where
    F: Future<Output = ActionResult> + Send + 'static,
{
    assert!(max_concurrent > 0, "max_concurrent must be at least 1");

    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut handles = Vec::with_capacity(tasks.len());

    for task in tasks {
        let sem = semaphore.clone();
        let account = task.account;
        let region = task.region;
        let future = task.future;
        handles.push((
            account.clone(),
            region.clone(),
            tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(p) => p,
                    Err(_) => {
                        return ActionResult::failure(account, region, "executor shut down")
                    }
                };
                future.await
            }),
        ));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (account, region, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(join_err) => {
                results.push(ActionResult::failure(
                    account,
                    region,
                    format!("task panicked: {join_err}"),
                ));
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ActionStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn settle_all_returns_one_result_per_task() {
        let tasks: Vec<_> = (0..7)
            .map(|i| {
                BatchTask::new(format!("{i:012}"), "us-east-1", async move {
                    if i % 2 == 0 {
                        ActionResult::success(format!("{i:012}"), "us-east-1", "ok")
                    } else {
                        ActionResult::failure(format!("{i:012}"), "us-east-1", "boom")
                    }
                })
            })
            .collect();

        let results = run_batch(tasks, 3).await;
        assert_eq!(results.len(), 7);
        let failures = results.iter().filter(|r| r.is_failure()).count();
        assert_eq!(failures, 3);
        // Submission order preserved in the result list.
        assert_eq!(results[0].account, "000000000000");
        assert_eq!(results[6].account, "000000000006");
    }

    #[tokio::test]
    async fn concurrency_cap_never_exceeded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..7)
            .map(|i| {
                let active = active.clone();
                let peak = peak.clone();
                BatchTask::new(format!("acct-{i}"), "us-east-1", async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    ActionResult::success(format!("acct-{i}"), "us-east-1", "ok")
                })
            })
            .collect();

        let results = run_batch(tasks, 2).await;
        assert_eq!(results.len(), 7);
        assert!(peak.load(Ordering::SeqCst) <= 2, "cap exceeded");
    }

    #[tokio::test]
    async fn panicked_task_fails_its_own_slot_only() {
        let tasks: Vec<BatchTask<BoxedActionFuture>> = vec![
            BatchTask::new(
                "good",
                "us-east-1",
                Box::pin(async { ActionResult::success("good", "us-east-1", "ok") })
                    as BoxedActionFuture,
            ),
            BatchTask::new(
                "bad",
                "us-east-1",
                Box::pin(async {
                    panic!("handler bug");
                    #[allow(unreachable_code)]
                    ActionResult::failure("bad", "us-east-1", "unreachable")
                }) as BoxedActionFuture,
            ),
        ];

        let results = run_batch(tasks, 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ActionStatus::Success);
        assert!(results[1].is_failure());
        assert_eq!(results[1].account, "bad");
        assert!(results[1].message.contains("panicked"));
    }

    #[tokio::test]
    async fn serial_bound_still_completes_all() {
        let tasks: Vec<_> = (0..4)
            .map(|i| {
                BatchTask::new(format!("acct-{i}"), "eu-west-1", async move {
                    ActionResult::success(format!("acct-{i}"), "eu-west-1", "ok")
                })
            })
            .collect();
        let results = run_batch(tasks, 1).await;
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| !r.is_failure()));
    }
}
