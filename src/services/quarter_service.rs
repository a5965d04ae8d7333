//! Quarterly rollup: merges a month's contribution into its quarter report.

use crate::error::{AppError, AppResult};
use crate::models::{MonthlyContribution, Quarter, QuarterReport, ReportFacet};
use crate::store::ReportStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct QuarterService {
    store: Arc<dyn ReportStore>,
}

impl QuarterService {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// Merge the month's contribution into the owning quarter report,
    /// creating it when absent. Each (restaurant, year, month) merges exactly
    /// once, ever: a persisted idempotency key is claimed before the merge,
    /// and a replay returns the stored report untouched.
    pub async fn rollup(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
        contribution: &MonthlyContribution,
    ) -> AppResult<QuarterReport> {
        let quarter = Quarter::from_month(month);

        let first_application = self
            .store
            .record_quarter_contribution(restaurant_id, year, month)
            .await?;
        if !first_application {
            log::warn!(
                "Contribution for restaurant {restaurant_id} {year}-{month:02} \
                 already merged into {}; skipping",
                quarter.as_str()
            );
            return self
                .store
                .quarter_report(restaurant_id, year, quarter)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Quarter {} {year} marked applied for restaurant {restaurant_id} \
                         but no report exists",
                        quarter.as_str()
                    ))
                });
        }

        let mut report = self
            .store
            .quarter_report(restaurant_id, year, quarter)
            .await?
            .unwrap_or(QuarterReport {
                restaurant_id,
                year,
                quarter,
                daily_average_orders: 0,
                total_revenue: 0.0,
                daily_orders: Default::default(),
            });

        report.daily_average_orders += contribution.daily_average_orders;
        report.total_revenue += contribution.total_revenue;
        for (day, count) in &contribution.daily_orders {
            *report.daily_orders.entry(*day).or_insert(0) += count;
        }

        self.store
            .upsert_report(&ReportFacet::Quarter(report.clone()))
            .await?;
        Ok(report)
    }
}
