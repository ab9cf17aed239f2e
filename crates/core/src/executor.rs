//! Bounded-concurrency task execution
//!
//! Runs independently failing futures with at most `concurrency` of them in
//! flight. Tasks are started in submission order as slots free up. A failure
//! never cancels the other tasks: every task settles before the outcome is
//! reported.

use crate::error::{Error, Result};
use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;

/// Default number of concurrent uploads
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Clamp a requested concurrency to `[1, task_count]`.
///
/// Requests below 1 are a configuration error rather than silently raised.
pub fn clamp_concurrency(requested: usize, task_count: usize) -> Result<usize> {
    if requested < 1 {
        return Err(Error::ConcurrencyConfig(requested));
    }
    Ok(requested.min(task_count).max(1))
}

/// Run every task with bounded concurrency and collect their results.
///
/// Results come back in submission order. If any task failed, the returned
/// [`Error::UploadTask`] carries one message per failure, in submission order.
pub async fn run_all<T, E, F>(tasks: Vec<F>, concurrency: usize) -> Result<Vec<T>>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let limit = clamp_concurrency(concurrency, tasks.len())?;

    // One slot per task, filled as tasks settle in whatever order they finish
    let mut slots: Vec<Option<std::result::Result<T, String>>> =
        std::iter::repeat_with(|| None).take(tasks.len()).collect();

    let mut settled = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move { (index, task.await) })
        .buffer_unordered(limit);

    while let Some((index, outcome)) = settled.next().await {
        slots[index] = Some(outcome.map_err(|e| e.to_string()));
    }

    let mut values = Vec::with_capacity(slots.len());
    let mut failures = Vec::new();
    for slot in slots {
        match slot {
            Some(Ok(value)) => values.push(value),
            Some(Err(message)) => failures.push(message),
            None => failures.push("task never settled".to_string()),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(Error::UploadTask(failures))
    }
}
