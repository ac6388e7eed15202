//! Daily trigger.
//!
//! Wakes every `poll_interval_secs`, and runs the job when the UTC hour and
//! minute equal the configured time and it has not run yet today. A minute
//! the process was not awake for is simply skipped until the next day.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{info, instrument};

/// Whether the job should fire at `now`.
pub fn is_due(now: DateTime<Utc>, run_at: NaiveTime, last_run: Option<NaiveDate>) -> bool {
    now.hour() == run_at.hour()
        && now.minute() == run_at.minute()
        && last_run != Some(now.date_naive())
}

/// Run `job` once per day at `run_at` until `shutdown` resolves.
///
/// `shutdown` is polled during the job as well as between polls, so an
/// interrupt is never lost; an interrupted job is dropped.
#[instrument(level = "info", skip(shutdown, job))]
pub async fn run_daily<S, F, Fut>(run_at: NaiveTime, poll_interval: Duration, shutdown: S, mut job: F)
where
    S: Future,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(run_at = %run_at.format("%H:%M"), "Scheduler started (UTC); press Ctrl-C to stop");
    let mut last_run: Option<NaiveDate> = None;
    tokio::pin!(shutdown);

    loop {
        let now = Utc::now();
        if is_due(now, run_at, last_run) {
            last_run = Some(now.date_naive());
            tokio::select! {
                _ = job() => {}
                _ = &mut shutdown => {
                    info!("Interrupted during a run; scheduler stopping");
                    break;
                }
            }
            info!(next = %format!("tomorrow {}", run_at.format("%H:%M")), "Scheduled run finished");
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = &mut shutdown => {
                info!("Interrupted; scheduler stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, h, m, s).unwrap()
    }

    fn eight() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_due_only_in_the_configured_minute() {
        assert!(is_due(at(8, 0, 0), eight(), None));
        assert!(is_due(at(8, 0, 59), eight(), None));
        assert!(!is_due(at(7, 59, 59), eight(), None));
        assert!(!is_due(at(8, 1, 0), eight(), None));
        assert!(!is_due(at(20, 0, 0), eight(), None));
    }

    #[test]
    fn test_at_most_once_per_day() {
        let today = at(8, 0, 0).date_naive();
        assert!(!is_due(at(8, 0, 50), eight(), Some(today)));

        let yesterday = today.pred_opt().unwrap();
        assert!(is_due(at(8, 0, 10), eight(), Some(yesterday)));
    }

    #[tokio::test]
    async fn test_shutdown_stops_a_long_sleep() {
        let never = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let runs = std::cell::Cell::new(0);
        let stopped = tokio::time::timeout(
            Duration::from_secs(5),
            run_daily(
                never,
                Duration::from_secs(3600),
                tokio::time::sleep(Duration::from_millis(20)),
                || {
                    runs.set(runs.get() + 1);
                    std::future::pending::<()>()
                },
            ),
        )
        .await;
        assert!(stopped.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_a_running_job() {
        let run_at = Utc::now().time();
        let runs = std::cell::Cell::new(0);
        let stopped = tokio::time::timeout(
            Duration::from_secs(5),
            run_daily(
                run_at,
                Duration::from_secs(3600),
                tokio::time::sleep(Duration::from_millis(20)),
                || {
                    runs.set(runs.get() + 1);
                    std::future::pending::<()>()
                },
            ),
        )
        .await;
        assert!(stopped.is_ok());
        assert!(runs.get() <= 1);
    }
}
