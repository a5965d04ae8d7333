use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key shared by the three monthly report facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub restaurant_id: i64,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeReport {
    pub period: ReportPeriod,
    /// Sum of order costs in the period (post-discount, surcharge included).
    /// Not reconciled against the per-category revenues below.
    pub total_revenue: f64,
    pub salad_revenue: f64,
    pub sweets_revenue: f64,
    pub drinks_revenue: f64,
    pub main_meal_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMixReport {
    pub period: ReportPeriod,
    pub total_orders: i64,
    pub salad_orders: i64,
    pub sweets_orders: i64,
    pub drinks_orders: i64,
    pub main_meal_orders: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub period: ReportPeriod,
    pub on_time_orders: i64,
    pub late_orders: i64,
    /// Mean of the recorded durations in seconds, formatted `HH:MM:SS`
    /// (sign-prefixed when negative).
    pub average_delay: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterReport {
    pub restaurant_id: i64,
    pub year: i32,
    pub quarter: Quarter,
    /// Cumulative integer daily-average across applied months.
    pub daily_average_orders: i64,
    pub total_revenue: f64,
    /// Order count per calendar day, unique per date.
    pub daily_orders: BTreeMap<NaiveDate, i64>,
}

/// Tagged variant over the four persisted report shapes, so the store layer
/// can upsert any facet through one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportFacet {
    Income(IncomeReport),
    OrderMix(OrderMixReport),
    Performance(PerformanceReport),
    Quarter(QuarterReport),
}

/// The partial quarter-bound data a month's aggregation hands to the rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyContribution {
    pub daily_orders: BTreeMap<NaiveDate, i64>,
    /// Order count divided by distinct order days, integer division.
    pub daily_average_orders: i64,
    pub total_revenue: f64,
}
