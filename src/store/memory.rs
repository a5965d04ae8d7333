//! In-memory [`ReportStore`] used as a test double.

use crate::error::{AppError, AppResult};
use crate::models::{
    Customer, IncomeReport, Order, OrderMixReport, OrderStatus, PerformanceReport, Quarter,
    QuarterReport, ReportFacet,
};
use crate::store::ReportStore;
use async_trait::async_trait;
use chrono::Datelike;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

type PeriodKey = (i64, i32, u32);
type QuarterKey = (i64, i32, Quarter);

#[derive(Default)]
struct Inner {
    orders: Vec<Order>,
    customers: HashMap<i64, Customer>,
    income: HashMap<PeriodKey, IncomeReport>,
    order_mix: HashMap<PeriodKey, OrderMixReport>,
    performance: HashMap<PeriodKey, PerformanceReport>,
    quarters: HashMap<QuarterKey, QuarterReport>,
    applied_months: HashSet<PeriodKey>,
    failing_restaurants: HashSet<i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_customer(&self, customer: Customer) {
        let mut inner = self.inner.lock().unwrap();
        inner.customers.insert(customer.id, customer);
    }

    pub fn insert_order(&self, order: Order) {
        let mut inner = self.inner.lock().unwrap();
        inner.orders.push(order);
    }

    /// Make every subsequent order read for the restaurant fail, to exercise
    /// per-restaurant failure isolation.
    pub fn fail_reads_for(&self, restaurant_id: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing_restaurants.insert(restaurant_id);
    }

    pub fn coupon_balance(&self, customer_id: i64) -> i64 {
        let inner = self.inner.lock().unwrap();
        inner.customers.get(&customer_id).map_or(0, |c| c.coupons)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn orders_in_period(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Vec<Order>> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_restaurants.contains(&restaurant_id) {
            return Err(AppError::InternalError(format!(
                "simulated read failure for restaurant {restaurant_id}"
            )));
        }
        Ok(inner
            .orders
            .iter()
            .filter(|o| {
                o.restaurant_id == restaurant_id
                    && o.placed_date.year() == year
                    && o.placed_date.month() == month
            })
            .cloned()
            .collect())
    }

    async fn restaurant_ids_with_orders(&self) -> AppResult<Vec<i64>> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<i64> = inner
            .orders
            .iter()
            .map(|o| o.restaurant_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn upsert_report(&self, facet: &ReportFacet) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match facet {
            ReportFacet::Income(r) => {
                let key = (r.period.restaurant_id, r.period.year, r.period.month);
                inner.income.insert(key, r.clone());
            }
            ReportFacet::OrderMix(r) => {
                let key = (r.period.restaurant_id, r.period.year, r.period.month);
                inner.order_mix.insert(key, r.clone());
            }
            ReportFacet::Performance(r) => {
                let key = (r.period.restaurant_id, r.period.year, r.period.month);
                inner.performance.insert(key, r.clone());
            }
            ReportFacet::Quarter(r) => {
                let key = (r.restaurant_id, r.year, r.quarter);
                inner.quarters.insert(key, r.clone());
            }
        }
        Ok(())
    }

    async fn income_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<IncomeReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.income.get(&(restaurant_id, year, month)).cloned())
    }

    async fn order_mix_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<OrderMixReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.order_mix.get(&(restaurant_id, year, month)).cloned())
    }

    async fn performance_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<PerformanceReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.performance.get(&(restaurant_id, year, month)).cloned())
    }

    async fn quarter_report(
        &self,
        restaurant_id: i64,
        year: i32,
        quarter: Quarter,
    ) -> AppResult<Option<QuarterReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.quarters.get(&(restaurant_id, year, quarter)).cloned())
    }

    async fn record_quarter_contribution(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.applied_months.insert((restaurant_id, year, month)))
    }

    async fn order(&self, order_id: i64) -> AppResult<Option<Order>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn set_order_received(&self, order_id: i64, duration: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id}")))?;
        if order.duration.is_some() {
            return Ok(false);
        }
        order.status = OrderStatus::Received;
        order.duration = Some(duration.to_string());
        Ok(true)
    }

    async fn customer(&self, customer_id: i64) -> AppResult<Option<Customer>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.customers.get(&customer_id).cloned())
    }

    async fn grant_coupon(&self, customer_id: i64) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let customer = inner
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| AppError::NotFound(format!("Customer {customer_id}")))?;
        customer.coupons += 1;
        Ok(())
    }

    async fn consume_coupon(&self, customer_id: i64) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let customer = inner
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| AppError::NotFound(format!("Customer {customer_id}")))?;
        if customer.coupons > 0 {
            customer.coupons -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
