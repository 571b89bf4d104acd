//! Polling assertions for async tests, on tokio's clock so they also work
//! under `#[tokio::test(start_paused = true)]`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Poll `probe` every `every` until it yields `Ok`, returning that value.
/// Panics with the last `Err` once `within` has passed.
pub async fn assert_eventually<F, Fut, T, E>(
    what: &str,
    within: Duration,
    every: Duration,
    mut probe: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let deadline = Instant::now() + within;
    let mut polls = 0u32;

    loop {
        polls += 1;
        let last = match probe().await {
            Ok(value) => return value,
            Err(e) => e,
        };
        if Instant::now() >= deadline {
            panic!(
                "gave up waiting for {} after {:?} ({} polls); last state: {}",
                what, within, polls, last
            );
        }
        sleep(every).await;
    }
}

/// [`assert_eventually`] for a plain condition
pub async fn assert_eventually_bool<F, Fut>(what: &str, within: Duration, every: Duration, mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    assert_eventually(what, within, every, || {
        let check = cond();
        async move { check.await.then_some(()).ok_or("still false") }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::watch;

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_matching_value() {
        let (tx, rx) = watch::channel(0u32);
        tokio::spawn(async move {
            for n in 1..=5 {
                sleep(Duration::from_millis(100)).await;
                let _ = tx.send(n);
            }
        });

        let seen = assert_eventually(
            "value to pass 2",
            Duration::from_secs(1),
            Duration::from_millis(100),
            || {
                let n = *rx.borrow();
                async move {
                    if n > 2 {
                        Ok(n)
                    } else {
                        Err(format!("at {}", n))
                    }
                }
            },
        )
        .await;

        assert!(seen > 2);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "gave up waiting for never true")]
    async fn test_bool_variant_panics_at_deadline() {
        assert_eventually_bool(
            "never true",
            Duration::from_millis(200),
            Duration::from_millis(50),
            || async { false },
        )
        .await;
    }
}
