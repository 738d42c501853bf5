//! Daily interest accrual scheduling.
//!
//! The ledger only exposes `run_daily_accrual_batch(date)`; this module decides
//! when to call it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use bankcore_core::Clock;
use bankcore_infra::services::AccrualBatchReport;

use crate::app::AppServices;

/// Time until the next `at` (bank-local wall time) strictly after `now`.
pub fn next_run_delay(now: DateTime<Utc>, offset: FixedOffset, at: NaiveTime) -> Duration {
    let local = now.with_timezone(&offset).naive_local();
    let mut next = local.date().and_time(at);
    if next <= local {
        next += TimeDelta::days(1);
    }
    (next - local).to_std().unwrap_or_default()
}

/// Run the accrual batch for `business_date` on the blocking pool.
pub async fn run_batch(
    services: Arc<AppServices>,
    business_date: NaiveDate,
) -> anyhow::Result<AccrualBatchReport> {
    let report = tokio::task::spawn_blocking(move || {
        services.ledger.batch.run_daily_accrual_batch(business_date)
    })
    .await??;
    Ok(report)
}

/// Spawn the daily accrual loop. Each run accrues the business date current
/// when it fires.
pub fn spawn_daily_accrual(services: Arc<AppServices>, at: NaiveTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let clock = services.ledger.clock().clone();
            let delay = next_run_delay(clock.now(), clock.offset(), at);
            info!(delay_secs = delay.as_secs(), at = %at, "next daily accrual scheduled");
            tokio::time::sleep(delay).await;

            let business_date = clock.today();
            match run_batch(services.clone(), business_date).await {
                Ok(report) if report.is_success() => {
                    info!(business_date = %business_date, processed = report.processed, "daily accrual finished");
                }
                Ok(report) => {
                    warn!(
                        business_date = %business_date,
                        failures = report.failures,
                        total = report.total(),
                        "daily accrual finished with failures"
                    );
                }
                Err(e) => error!(business_date = %business_date, error = %e, "daily accrual failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seoul() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn ten_past_midnight() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 10, 0).unwrap()
    }

    #[test]
    fn waits_until_later_today() {
        // 2025-03-09 15:00 UTC is 2025-03-10 00:00 in Seoul.
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 15, 0, 0).unwrap();
        assert_eq!(
            next_run_delay(now, seoul(), ten_past_midnight()),
            Duration::from_secs(10 * 60)
        );
    }

    #[test]
    fn rolls_over_to_tomorrow_once_passed() {
        // 00:10 local exactly: the run just fired, next one is a day away.
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 15, 10, 0).unwrap();
        assert_eq!(
            next_run_delay(now, seoul(), ten_past_midnight()),
            Duration::from_secs(24 * 60 * 60)
        );

        let now = Utc.with_ymd_and_hms(2025, 3, 10, 3, 0, 0).unwrap();
        assert_eq!(
            next_run_delay(now, seoul(), ten_past_midnight()),
            Duration::from_secs((12 * 60 + 10) * 60)
        );
    }
}
