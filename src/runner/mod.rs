use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::{DigestError, Result};

/// One finished unit of work, paired with the arguments it was submitted with
#[derive(Debug)]
pub struct TaskOutcome<A, T> {
    pub args: A,
    pub result: Result<T>,
}

impl<A, T> TaskOutcome<A, T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `task_fn` once per entry of `args_list` with at most `max_workers` tasks in flight.
///
/// Every submitted argument yields exactly one [`TaskOutcome`], in completion order.
/// A failing or panicking task only affects its own outcome. A bound of 0 is treated as 1.
pub async fn run_concurrent_tasks<A, T, F, Fut>(
    task_fn: F,
    args_list: Vec<A>,
    max_workers: usize,
) -> Vec<TaskOutcome<A, T>>
where
    A: Clone + Send + 'static,
    T: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let workers = max_workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let task_fn = Arc::new(task_fn);

    tracing::debug!("Submitting {} tasks to a pool of {} workers", args_list.len(), workers);

    let mut pending: FuturesUnordered<_> = args_list
        .into_iter()
        .map(|args| {
            let semaphore = Arc::clone(&semaphore);
            let task_fn = Arc::clone(&task_fn);

            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return TaskOutcome {
                            args,
                            result: Err(DigestError::new(format!("worker pool closed: {}", e))),
                        }
                    }
                };

                // Call and body both run in their own task so a panic is reported against these args
                let job = args.clone();
                let work = tokio::spawn(async move { task_fn(job).await });
                let result = match work.await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(DigestError::new(format!(
                        "task panicked: {}",
                        panic_message(e.into_panic())
                    ))),
                    Err(e) => Err(DigestError::new(format!("task did not complete: {}", e))),
                };

                TaskOutcome { args, result }
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(pending.len());
    while let Some(joined) = pending.next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            // The wrapper only awaits the inner task; runtime shutdown lands here
            Err(e) => tracing::error!("Worker task lost: {}", e),
        }
    }

    outcomes
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_job_gets_one_outcome() {
        let args: Vec<u32> = (0..25).collect();
        let outcomes = run_concurrent_tasks(|n| async move { Ok(n * 2) }, args, 4).await;

        assert_eq!(outcomes.len(), 25);
        let mut seen: Vec<u32> = outcomes.iter().map(|o| o.args).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
        for outcome in &outcomes {
            assert_eq!(*outcome.result.as_ref().unwrap(), outcome.args * 2);
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let args = vec!["a", "boom", "c"];
        let outcomes = run_concurrent_tasks(
            |s: &'static str| async move {
                if s == "boom" {
                    Err(DigestError::new("exploded"))
                } else {
                    Ok(s.to_uppercase())
                }
            },
            args,
            4,
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        for outcome in outcomes {
            match outcome.args {
                "boom" => assert_eq!(outcome.result.unwrap_err().message(), "exploded"),
                other => assert_eq!(outcome.result.unwrap(), other.to_uppercase()),
            }
        }
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let outcomes = run_concurrent_tasks(
            |n: u8| async move {
                if n == 1 {
                    panic!("bad input {}", n);
                }
                Ok(n)
            },
            vec![0, 1, 2],
            2,
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].args, 1);
        let message = failed[0].result.as_ref().unwrap_err().message().to_string();
        assert!(message.contains("bad input 1"), "{}", message);
    }

    #[tokio::test]
    async fn test_panic_before_future_is_captured() {
        let outcomes = run_concurrent_tasks(
            |n: u8| {
                if n == 1 {
                    panic!("rejected {} up front", n);
                }
                async move { Ok(n) }
            },
            vec![0, 1, 2],
            4,
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].args, 1);
        let message = failed[0].result.as_ref().unwrap_err().message().to_string();
        assert!(message.contains("rejected 1 up front"), "{}", message);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_respects_worker_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let outcomes = run_concurrent_tasks(
            move |_: usize| {
                let running = Arc::clone(&r);
                let peak = Arc::clone(&p);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            (0..12).collect(),
            3,
        )
        .await;

        assert_eq!(outcomes.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_zero_workers_still_runs() {
        let outcomes = run_concurrent_tasks(|n: i32| async move { Ok(n) }, vec![1, 2], 0).await;
        assert_eq!(outcomes.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let outcomes =
            run_concurrent_tasks(|n: i32| async move { Ok(n) }, Vec::new(), 4).await;
        assert!(outcomes.is_empty());
    }
}
