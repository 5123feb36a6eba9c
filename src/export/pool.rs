use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;

/// Run `task` over `items` with at most `concurrency` in flight.
///
/// Workers pull the next index from a shared queue as they finish, so one
/// slow item never holds up a whole batch. `on_complete` is called with the
/// running count after each item. Results come back in input order.
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    task: F,
    on_complete: impl Fn(usize, usize),
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let done = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<R>>> = Mutex::new((0..total).map(|_| None).collect());

    let workers = concurrency.clamp(1, total);
    let (queue, slots, done, task, on_complete) = (&queue, &slots, &done, &task, &on_complete);
    let worker = || async move {
        loop {
            let next = queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some((index, item)) = next else {
                break;
            };
            let result = task(item).await;
            slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(result);
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            on_complete(finished, total);
        }
    };
    join_all((0..workers).map(|_| worker())).await;

    std::mem::take(&mut *slots.lock().unwrap_or_else(PoisonError::into_inner))
        .into_iter()
        .flatten()
        .collect()
}
