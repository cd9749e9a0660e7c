//! Tests for the token-bucket rate limiter.

use std::sync::Arc;
use std::time::Duration;

use logpipe::limiter::RateLimiter;
use tokio::time::{timeout, Instant};

#[tokio::test(start_paused = true)]
async fn test_burst_is_immediately_available() {
    let limiter = RateLimiter::new(10, 4);
    let started = Instant::now();
    for _ in 0..4 {
        limiter.acquire().await;
    }
    assert!(started.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_pacing_beyond_burst() {
    let limiter = RateLimiter::new(10, 1);
    limiter.acquire().await;

    let started = Instant::now();
    limiter.acquire().await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(90), "waited {waited:?}");
    assert!(waited <= Duration::from_millis(200), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn test_zero_rate_parks_waiters() {
    let limiter = Arc::new(RateLimiter::new(0, 1));
    limiter.acquire().await; // drain the initial burst token

    let mut waiter = {
        let limiter = limiter.clone();
        tokio::spawn(async move { limiter.acquire().await })
    };

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(600)) => {}
        _ = &mut waiter => panic!("acquire completed while rate was zero"),
    }

    limiter.set_rate(100);
    timeout(Duration::from_secs(600), &mut waiter)
        .await
        .expect("waiter should complete once rate is raised")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_set_rate_takes_effect_on_next_wait() {
    let limiter = RateLimiter::new(1, 1);
    limiter.acquire().await;
    limiter.set_rate(1000);

    let started = Instant::now();
    limiter.acquire().await;
    assert!(started.elapsed() <= Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_tokens_do_not_accumulate_past_burst() {
    let limiter = RateLimiter::new(1000, 2);
    tokio::time::sleep(Duration::from_secs(60)).await;

    // Only burst tokens are instantly available despite the long idle.
    let started = Instant::now();
    limiter.acquire().await;
    limiter.acquire().await;
    assert!(started.elapsed() < Duration::from_millis(1));
    limiter.acquire().await;
    assert!(started.elapsed() >= Duration::from_micros(500));
}

#[test]
fn test_rate_getter() {
    let limiter = RateLimiter::new(25, 4);
    assert_eq!(limiter.rate(), 25);
    limiter.set_rate(50);
    assert_eq!(limiter.rate(), 50);
}
