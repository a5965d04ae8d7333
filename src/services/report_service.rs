//! Monthly report aggregation: one (restaurant, year, month) in, the three
//! monthly facets plus the quarter-bound contribution out.

use crate::error::AppResult;
use crate::models::{
    IncomeReport, ItemCategory, MonthlyContribution, Order, OrderMixReport, PerformanceReport,
    ReportFacet, ReportPeriod,
};
use crate::policies::timing::{self, Timeliness};
use crate::store::ReportStore;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
}

/// Everything one monthly aggregation produces.
#[derive(Debug, Clone)]
pub struct MonthlyReports {
    pub income: IncomeReport,
    pub order_mix: OrderMixReport,
    pub performance: PerformanceReport,
    pub contribution: MonthlyContribution,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// Scan the restaurant's orders for the period and compute all facets.
    /// Orders with malformed time or duration strings are dropped from the
    /// performance counts only (logged, never fatal to the period).
    pub async fn aggregate(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<MonthlyReports> {
        let orders = self
            .store
            .orders_in_period(restaurant_id, year, month)
            .await?;
        let period = ReportPeriod {
            restaurant_id,
            year,
            month,
        };

        let mut total_revenue = 0.0f64;
        let mut category_revenue = [0.0f64; 4];
        let mut category_orders = [0i64; 4];
        let mut daily_orders: BTreeMap<_, i64> = BTreeMap::new();

        let mut on_time = 0i64;
        let mut late = 0i64;
        let mut delay_seconds = 0i64;
        let mut delay_samples = 0i64;

        for order in &orders {
            // All orders count toward revenue and the mix, cancelled included.
            total_revenue += order.cost;
            *daily_orders.entry(order.placed_date).or_insert(0) += 1;
            for line in &order.lines {
                let idx = category_index(line.category);
                category_orders[idx] += 1;
                category_revenue[idx] += line.quantity as f64 * line.unit_cost;
            }

            if let Some(duration) = &order.duration {
                match classify(order, duration) {
                    Ok((timeliness, seconds)) => {
                        match timeliness {
                            Timeliness::OnTime => on_time += 1,
                            Timeliness::Late => late += 1,
                        }
                        delay_seconds += seconds;
                        delay_samples += 1;
                    }
                    Err(e) => {
                        log::warn!(
                            "Excluding order {} from performance counts: {e}",
                            order.id
                        );
                    }
                }
            }
        }

        let average_delay = if delay_samples == 0 {
            timing::format_delay_seconds(0)
        } else {
            timing::format_delay_seconds(delay_seconds / delay_samples)
        };

        let daily_average_orders = if daily_orders.is_empty() {
            0
        } else {
            orders.len() as i64 / daily_orders.len() as i64
        };

        let [salad_orders, sweets_orders, drinks_orders, main_meal_orders] = category_orders;
        let [salad_revenue, sweets_revenue, drinks_revenue, main_meal_revenue] = category_revenue;

        Ok(MonthlyReports {
            income: IncomeReport {
                period,
                total_revenue,
                salad_revenue,
                sweets_revenue,
                drinks_revenue,
                main_meal_revenue,
            },
            order_mix: OrderMixReport {
                period,
                // Line-item count per category; the total is their sum so the
                // mix always reconciles.
                total_orders: category_orders.iter().sum(),
                salad_orders,
                sweets_orders,
                drinks_orders,
                main_meal_orders,
            },
            performance: PerformanceReport {
                period,
                on_time_orders: on_time,
                late_orders: late,
                average_delay,
            },
            contribution: MonthlyContribution {
                daily_orders,
                daily_average_orders,
                total_revenue,
            },
        })
    }

    /// Aggregate and persist the three monthly facets, returning the
    /// contribution for the quarterly rollup. Any store failure aborts this
    /// restaurant's period and is surfaced to the caller.
    pub async fn generate(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<MonthlyContribution> {
        let reports = self.aggregate(restaurant_id, year, month).await?;
        self.store
            .upsert_report(&ReportFacet::Income(reports.income))
            .await?;
        self.store
            .upsert_report(&ReportFacet::OrderMix(reports.order_mix))
            .await?;
        self.store
            .upsert_report(&ReportFacet::Performance(reports.performance))
            .await?;
        Ok(reports.contribution)
    }
}

fn category_index(category: ItemCategory) -> usize {
    match category {
        ItemCategory::Salad => 0,
        ItemCategory::Sweets => 1,
        ItemCategory::Drinks => 2,
        ItemCategory::MainMeal => 3,
    }
}

fn classify(order: &Order, duration: &str) -> AppResult<(Timeliness, i64)> {
    let placed_at = order.placed_at()?;
    let requested_at = order.requested_at()?;
    let timeliness = timing::classify_received(placed_at, requested_at, duration)?;
    Ok((timeliness, timing::duration_seconds(duration)?))
}
