use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use video_digest::{run_concurrent_tasks, DigestError};

#[test]
fn test_outcomes_pair_with_their_arguments() {
    let outcomes = tokio_test::block_on(run_concurrent_tasks(
        |word: String| async move {
            if word.is_empty() {
                return Err(DigestError::new("empty word"));
            }
            Ok(word.len())
        },
        vec!["ferris".to_string(), String::new(), "crab".to_string()],
        2,
    ));

    assert_eq!(outcomes.len(), 3);
    for outcome in outcomes {
        match outcome.args.as_str() {
            "" => assert_eq!(outcome.result.unwrap_err().message(), "empty word"),
            word => assert_eq!(outcome.result.unwrap(), word.len()),
        }
    }
}

#[test]
fn test_every_task_runs_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let outcomes = tokio_test::block_on(run_concurrent_tasks(
        move |n: usize| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            }
        },
        (0..40).collect(),
        5,
    ));

    assert_eq!(outcomes.len(), 40);
    assert_eq!(calls.load(Ordering::SeqCst), 40);
    assert!(outcomes.iter().all(|o| o.is_success()));
}
