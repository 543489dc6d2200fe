use rand::Rng;
use std::io::Write;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

pub async fn sleep_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

/// Randomized pause drawn uniformly from `min_ms..=max_ms`.
pub async fn random_delay(min_ms: u64, max_ms: u64) {
    let ms = if max_ms > min_ms {
        rand::thread_rng().gen_range(min_ms..=max_ms)
    } else {
        min_ms
    };
    sleep(Duration::from_millis(ms)).await;
}

/// Ticks down `seconds`, rewriting an `HH:MM:SS` line once per second.
/// Returns early (false) when the token is cancelled.
pub async fn countdown(seconds: u64, token: &CancellationToken) -> bool {
    let mut remaining = seconds;
    while remaining > 0 {
        let h = remaining / 3600;
        let m = (remaining % 3600) / 60;
        let s = remaining % 60;
        print!("Next run in: {:02}:{:02}:{:02} ...\r", h, m, s);
        let _ = std::io::stdout().flush();

        tokio::select! {
            _ = token.cancelled() => {
                println!();
                return false;
            }
            _ = sleep(Duration::from_secs(1)) => {}
        }
        remaining -= 1;
    }
    println!();
    true
}
