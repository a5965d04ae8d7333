//! Background report generation.
//!
//! One dedicated tokio task sits in an Idle/Running loop: it sleeps until the
//! first instant of the next calendar month, runs a full pass over every
//! restaurant with order history for the month that just ended, then re-arms.
//! The next tick is always recomputed from the calendar (never a fixed
//! interval, which drifts across 28-31 day months). Stopping the scheduler
//! never interrupts a running pass; it only prevents the next arm.

use crate::error::{AppError, AppResult};
use crate::services::{QuarterService, ReportService};
use crate::store::ReportStore;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct ReportScheduler {
    report_service: ReportService,
    quarter_service: QuarterService,
    store: Arc<dyn ReportStore>,
    restaurant_timeout: Duration,
    running: AtomicBool,
}

/// Handle returned by [`ReportScheduler::start`]; dropping it does not stop
/// the scheduler, calling [`SchedulerHandle::stop`] does (gracefully).
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            log::error!("Report scheduler task panicked: {e}");
        }
    }
}

/// Outcome of one full pass, for logging and manual re-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    pub generated: usize,
    pub failed: usize,
}

impl ReportScheduler {
    pub fn new(
        report_service: ReportService,
        quarter_service: QuarterService,
        store: Arc<dyn ReportStore>,
        restaurant_timeout: Duration,
    ) -> Self {
        Self {
            report_service,
            quarter_service,
            store,
            restaurant_timeout,
            running: AtomicBool::new(false),
        }
    }

    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown, rx) = watch::channel(false);
        log::info!("Report scheduler up and running");
        let join = tokio::spawn(async move {
            self.run_loop(rx).await;
        });
        SchedulerHandle { shutdown, join }
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            // Idle: arm the next tick at the first instant of next month.
            let delay = match next_tick_delay(Local::now().naive_local()) {
                Ok(d) => d,
                Err(e) => {
                    // Running on an undefined interval is worse than not
                    // running at all.
                    log::error!("Report scheduler cannot arm next tick, terminating: {e}");
                    return;
                }
            };
            log::info!(
                "Report scheduler idle; next pass in {}s",
                delay.as_secs()
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    log::info!("Report scheduler stopped while idle");
                    return;
                }
            }

            // Running: the pass is never raced against shutdown.
            let (year, month) = previous_month(Local::now().date_naive());
            self.run_pass(year, month).await;

            if *shutdown.borrow() {
                log::info!("Report scheduler stopped after pass");
                return;
            }
        }
    }

    /// Run one full pass for the given period. Also the manual re-run entry
    /// point; the quarter idempotency key makes re-runs safe. Failures are
    /// isolated per restaurant.
    pub async fn run_pass(&self, year: i32, month: u32) -> PassSummary {
        if self.running.swap(true, Ordering::SeqCst) {
            log::warn!("Report pass already running; skipping {year}-{month:02}");
            return PassSummary::default();
        }

        log::info!("Generating reports for {year}-{month:02}");
        let mut summary = PassSummary::default();

        let restaurant_ids = match self.store.restaurant_ids_with_orders().await {
            Ok(ids) => ids,
            Err(e) => {
                log::error!("Failed to enumerate restaurants for {year}-{month:02}: {e}");
                self.running.store(false, Ordering::SeqCst);
                return summary;
            }
        };

        for restaurant_id in restaurant_ids {
            let outcome = tokio::time::timeout(
                self.restaurant_timeout,
                self.generate_for(restaurant_id, year, month),
            )
            .await;
            match outcome {
                Ok(Ok(())) => summary.generated += 1,
                Ok(Err(e)) => {
                    summary.failed += 1;
                    log::error!(
                        "Report generation failed for restaurant {restaurant_id} \
                         {year}-{month:02}: {e}"
                    );
                }
                Err(_) => {
                    summary.failed += 1;
                    log::error!(
                        "Report generation timed out for restaurant {restaurant_id} \
                         {year}-{month:02}"
                    );
                }
            }
        }

        log::info!(
            "Report pass for {year}-{month:02} done: {} generated, {} failed",
            summary.generated,
            summary.failed
        );
        self.running.store(false, Ordering::SeqCst);
        summary
    }

    async fn generate_for(&self, restaurant_id: i64, year: i32, month: u32) -> AppResult<()> {
        let contribution = self
            .report_service
            .generate(restaurant_id, year, month)
            .await?;
        self.quarter_service
            .rollup(restaurant_id, year, month, &contribution)
            .await?;
        Ok(())
    }
}

/// The calendar month immediately preceding `today`.
pub fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

/// First instant of the calendar month after `now`.
pub fn next_month_start(now: NaiveDateTime) -> AppResult<NaiveDateTime> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is a valid time"))
        .ok_or_else(|| AppError::SchedulingError(format!("No first day for {year}-{month:02}")))
}

fn next_tick_delay(now: NaiveDateTime) -> AppResult<Duration> {
    let next = next_month_start(now)?;
    (next - now)
        .to_std()
        .map_err(|e| AppError::SchedulingError(format!("Next tick is in the past: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_month_handles_january() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(previous_month(day), (2024, 12));
    }

    #[test]
    fn test_previous_month_mid_year() {
        let day = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(previous_month(day), (2025, 3));
    }

    #[test]
    fn test_next_month_start_crosses_year() {
        let now = NaiveDate::from_ymd_opt(2024, 12, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let next = next_month_start(now).unwrap();
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_next_tick_tracks_month_length() {
        // February 2025 has 28 days; arming from Feb 1 must not assume 30.
        let now = NaiveDate::from_ymd_opt(2025, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let delay = next_tick_delay(now).unwrap();
        assert_eq!(delay.as_secs(), 28 * 24 * 3600);
    }
}
