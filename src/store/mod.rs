use crate::error::AppResult;
use crate::models::{
    Customer, IncomeReport, Order, OrderMixReport, PerformanceReport, Quarter, QuarterReport,
    ReportFacet,
};
use async_trait::async_trait;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistence collaborator for raw orders, customers and generated reports.
///
/// The production implementation is [`SqliteStore`]; [`MemoryStore`] is the
/// test double. Per-key writes are serialized by the backing store.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// All orders whose placement date falls in the given calendar month,
    /// line items included.
    async fn orders_in_period(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Vec<Order>>;

    /// Every restaurant with at least one order ever recorded.
    async fn restaurant_ids_with_orders(&self) -> AppResult<Vec<i64>>;

    /// Write a report facet, replacing any facet of the same kind and period.
    async fn upsert_report(&self, facet: &ReportFacet) -> AppResult<()>;

    async fn income_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<IncomeReport>>;

    async fn order_mix_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<OrderMixReport>>;

    async fn performance_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<PerformanceReport>>;

    async fn quarter_report(
        &self,
        restaurant_id: i64,
        year: i32,
        quarter: Quarter,
    ) -> AppResult<Option<QuarterReport>>;

    /// Record the (restaurant, year, month) idempotency key guarding the
    /// quarterly merge. Returns false when the key was already present, in
    /// which case the caller must not merge again.
    async fn record_quarter_contribution(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<bool>;

    async fn order(&self, order_id: i64) -> AppResult<Option<Order>>;

    /// Transition an order to Received and write its duration. The duration
    /// is written at most once; returns false when a value was already there,
    /// leaving it intact.
    async fn set_order_received(&self, order_id: i64, duration: &str) -> AppResult<bool>;

    async fn customer(&self, customer_id: i64) -> AppResult<Option<Customer>>;

    async fn grant_coupon(&self, customer_id: i64) -> AppResult<()>;

    /// Decrement the customer's coupon balance by one. Returns false when no
    /// coupon was available.
    async fn consume_coupon(&self, customer_id: i64) -> AppResult<bool>;
}
