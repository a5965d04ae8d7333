//! End-to-end coverage of the reporting engine and the live order flow,
//! running against the in-memory store.

use biteme_backend::models::{
    AccountKind, Customer, ItemCategory, MonthlyContribution, Order, OrderLine, OrderStatus,
    PickupKind, Quarter,
};
use biteme_backend::services::{OrderService, QuarterService, ReportService};
use biteme_backend::store::{MemoryStore, ReportStore};
use biteme_backend::tasks::{PassSummary, ReportScheduler};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

struct OrderBuilder {
    order: Order,
}

impl OrderBuilder {
    fn new(id: i64, restaurant_id: i64, day: NaiveDate) -> Self {
        Self {
            order: Order {
                id,
                restaurant_id,
                customer_id: 1,
                placed_date: day,
                placed_time: "10:00".to_string(),
                requested_date: day,
                requested_time: "11:00".to_string(),
                pickup: PickupKind::Takeaway,
                status: OrderStatus::Received,
                cost: 0.0,
                duration: None,
                lines: Vec::new(),
            },
        }
    }

    fn customer(mut self, customer_id: i64) -> Self {
        self.order.customer_id = customer_id;
        self
    }

    fn times(mut self, placed: &str, requested: &str) -> Self {
        self.order.placed_time = placed.to_string();
        self.order.requested_time = requested.to_string();
        self
    }

    fn pickup(mut self, pickup: PickupKind) -> Self {
        self.order.pickup = pickup;
        self
    }

    fn status(mut self, status: OrderStatus) -> Self {
        self.order.status = status;
        self
    }

    fn cost(mut self, cost: f64) -> Self {
        self.order.cost = cost;
        self
    }

    fn duration(mut self, duration: &str) -> Self {
        self.order.duration = Some(duration.to_string());
        self
    }

    fn line(mut self, category: ItemCategory, quantity: i64, unit_cost: f64) -> Self {
        self.order.lines.push(OrderLine {
            category,
            quantity,
            unit_cost,
        });
        self
    }

    fn build(self) -> Order {
        self.order
    }
}

fn seed_march_orders(store: &MemoryStore, restaurant_id: i64) {
    // Three Received orders: two on-time, one late (all short-lead, so the
    // grace bound is 60 minutes).
    store.insert_order(
        OrderBuilder::new(1, restaurant_id, date(2025, 3, 3))
            .cost(40.0)
            .duration("0:00:30")
            .line(ItemCategory::Salad, 2, 20.0)
            .build(),
    );
    store.insert_order(
        OrderBuilder::new(2, restaurant_id, date(2025, 3, 3))
            .cost(25.0)
            .duration("0:01:00")
            .line(ItemCategory::MainMeal, 1, 25.0)
            .build(),
    );
    store.insert_order(
        OrderBuilder::new(3, restaurant_id, date(2025, 3, 14))
            .cost(10.0)
            .duration("0:02:00")
            .line(ItemCategory::Drinks, 2, 5.0)
            .build(),
    );
    // A cancelled order without a duration: counts toward revenue and the
    // mix, never toward performance.
    store.insert_order(
        OrderBuilder::new(4, restaurant_id, date(2025, 3, 20))
            .status(OrderStatus::Cancelled)
            .cost(12.0)
            .line(ItemCategory::Sweets, 1, 12.0)
            .build(),
    );
}

#[tokio::test]
async fn test_march_aggregation_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    seed_march_orders(&store, 7);
    let service = ReportService::new(store.clone());

    let reports = service.aggregate(7, 2025, 3).await.unwrap();

    assert_eq!(reports.performance.on_time_orders, 2);
    assert_eq!(reports.performance.late_orders, 1);
    // Mean of 30, 60 and 120 minutes in seconds: 4200s.
    assert_eq!(reports.performance.average_delay, "01:10:00");

    let mix = &reports.order_mix;
    assert_eq!(
        mix.salad_orders + mix.sweets_orders + mix.drinks_orders + mix.main_meal_orders,
        mix.total_orders
    );
    assert_eq!(mix.salad_orders, 1);
    assert_eq!(mix.sweets_orders, 1);

    assert!((reports.income.total_revenue - 87.0).abs() < 1e-9);
    assert!((reports.income.salad_revenue - 40.0).abs() < 1e-9);
    assert!((reports.income.drinks_revenue - 10.0).abs() < 1e-9);

    // 4 orders over 3 distinct days, integer division.
    assert_eq!(reports.contribution.daily_average_orders, 1);
    assert_eq!(reports.contribution.daily_orders.len(), 3);
    assert_eq!(reports.contribution.daily_orders[&date(2025, 3, 3)], 2);
}

#[tokio::test]
async fn test_generate_persists_all_monthly_facets() {
    let store = Arc::new(MemoryStore::new());
    seed_march_orders(&store, 7);
    let service = ReportService::new(store.clone());

    service.generate(7, 2025, 3).await.unwrap();

    assert!(store.income_report(7, 2025, 3).await.unwrap().is_some());
    assert!(store.order_mix_report(7, 2025, 3).await.unwrap().is_some());
    let performance = store.performance_report(7, 2025, 3).await.unwrap().unwrap();
    assert_eq!(performance.on_time_orders, 2);
}

#[tokio::test]
async fn test_malformed_order_is_excluded_from_performance_only() {
    let store = Arc::new(MemoryStore::new());
    store.insert_order(
        OrderBuilder::new(1, 7, date(2025, 3, 3))
            .cost(30.0)
            .duration("0:00:10")
            .line(ItemCategory::Salad, 1, 30.0)
            .build(),
    );
    // Unparsable placed time: still revenue, never a performance sample.
    store.insert_order(
        OrderBuilder::new(2, 7, date(2025, 3, 4))
            .times("garbage", "11:00")
            .cost(20.0)
            .duration("0:00:10")
            .line(ItemCategory::Drinks, 1, 20.0)
            .build(),
    );
    let service = ReportService::new(store.clone());

    let reports = service.aggregate(7, 2025, 3).await.unwrap();
    assert_eq!(reports.performance.on_time_orders, 1);
    assert_eq!(reports.performance.late_orders, 0);
    assert!((reports.income.total_revenue - 50.0).abs() < 1e-9);
    assert_eq!(reports.order_mix.total_orders, 2);
}

fn contribution(dates: &[(NaiveDate, i64)], daily_average: i64, revenue: f64) -> MonthlyContribution {
    let mut daily_orders = BTreeMap::new();
    for (day, count) in dates {
        daily_orders.insert(*day, *count);
    }
    MonthlyContribution {
        daily_orders,
        daily_average_orders: daily_average,
        total_revenue: revenue,
    }
}

#[tokio::test]
async fn test_quarter_rollup_merges_months() {
    let store = Arc::new(MemoryStore::new());
    let service = QuarterService::new(store.clone());

    let january = contribution(&[(date(2025, 1, 10), 3)], 3, 100.0);
    let february = contribution(&[(date(2025, 2, 2), 2)], 2, 50.0);

    service.rollup(7, 2025, 1, &january).await.unwrap();
    let report = service.rollup(7, 2025, 2, &february).await.unwrap();

    assert_eq!(report.quarter, Quarter::Q1);
    assert_eq!(report.daily_average_orders, 5);
    assert!((report.total_revenue - 150.0).abs() < 1e-9);
    assert_eq!(report.daily_orders.len(), 2);
    assert_eq!(report.daily_orders[&date(2025, 1, 10)], 3);
}

#[tokio::test]
async fn test_quarter_rollup_replay_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let service = QuarterService::new(store.clone());

    let january = contribution(&[(date(2025, 1, 10), 3)], 3, 100.0);
    let first = service.rollup(7, 2025, 1, &january).await.unwrap();
    let replay = service.rollup(7, 2025, 1, &january).await.unwrap();

    assert_eq!(first, replay);
    let stored = store.quarter_report(7, 2025, Quarter::Q1).await.unwrap().unwrap();
    assert_eq!(stored.daily_average_orders, 3);
    assert!((stored.total_revenue - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_histogram_collisions_sum_counts() {
    let store = Arc::new(MemoryStore::new());
    let service = QuarterService::new(store.clone());

    let shared_day = date(2025, 4, 1);
    service
        .rollup(7, 2025, 4, &contribution(&[(shared_day, 2)], 2, 10.0))
        .await
        .unwrap();
    let report = service
        .rollup(7, 2025, 5, &contribution(&[(shared_day, 3)], 3, 10.0))
        .await
        .unwrap();

    assert_eq!(report.daily_orders[&shared_day], 5);
}

fn scheduler_for(store: Arc<MemoryStore>) -> ReportScheduler {
    ReportScheduler::new(
        ReportService::new(store.clone()),
        QuarterService::new(store.clone()),
        store,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_pass_isolates_per_restaurant_failures() {
    let store = Arc::new(MemoryStore::new());
    seed_march_orders(&store, 7);
    store.insert_order(
        OrderBuilder::new(50, 9, date(2025, 3, 8))
            .cost(15.0)
            .line(ItemCategory::Drinks, 3, 5.0)
            .build(),
    );
    store.fail_reads_for(9);

    let scheduler = scheduler_for(store.clone());
    let summary = scheduler.run_pass(2025, 3).await;

    assert_eq!(summary, PassSummary { generated: 1, failed: 1 });
    // The healthy restaurant's period still committed.
    assert!(store.income_report(7, 2025, 3).await.unwrap().is_some());
    assert!(store.quarter_report(7, 2025, Quarter::Q1).await.unwrap().is_some());
    assert!(store.income_report(9, 2025, 3).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pass_rerun_does_not_double_count_quarter() {
    let store = Arc::new(MemoryStore::new());
    seed_march_orders(&store, 7);

    let scheduler = scheduler_for(store.clone());
    scheduler.run_pass(2025, 3).await;
    let first = store.quarter_report(7, 2025, Quarter::Q1).await.unwrap().unwrap();

    scheduler.run_pass(2025, 3).await;
    let second = store.quarter_report(7, 2025, Quarter::Q1).await.unwrap().unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_mark_received_grants_one_coupon_and_writes_duration_once() {
    let store = Arc::new(MemoryStore::new());
    store.insert_customer(Customer {
        id: 1,
        account_kind: AccountKind::Personal,
        coupons: 0,
    });
    // Short-lead order requested for 11:00.
    store.insert_order(
        OrderBuilder::new(1, 7, date(2025, 3, 3))
            .status(OrderStatus::Ready)
            .cost(30.0)
            .build(),
    );
    let service = OrderService::new(store.clone());

    // Received 61 minutes past the requested time: late enough for a coupon.
    let now = date(2025, 3, 3).and_hms_opt(12, 1, 0).unwrap();
    let outcome = service.mark_received(1, now).await.unwrap();
    assert!(outcome.coupon_granted);
    assert_eq!(outcome.duration, "0:01:01");
    assert_eq!(store.coupon_balance(1), 1);

    // Marking again later changes nothing.
    let later = date(2025, 3, 3).and_hms_opt(15, 0, 0).unwrap();
    let replay = service.mark_received(1, later).await.unwrap();
    assert!(!replay.coupon_granted);
    assert_eq!(replay.duration, "0:01:01");
    assert_eq!(store.coupon_balance(1), 1);

    let stored = store.order(1).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Received);
    assert_eq!(stored.duration.as_deref(), Some("0:01:01"));
}

#[tokio::test]
async fn test_lost_receipt_race_grants_no_coupon() {
    let store = Arc::new(MemoryStore::new());
    store.insert_customer(Customer {
        id: 1,
        account_kind: AccountKind::Personal,
        coupons: 0,
    });
    // A concurrent receipt already wrote the duration, but this caller read
    // the order before the status flipped to Received.
    store.insert_order(
        OrderBuilder::new(1, 7, date(2025, 3, 3))
            .status(OrderStatus::Ready)
            .duration("0:02:00")
            .cost(30.0)
            .build(),
    );
    let service = OrderService::new(store.clone());

    // Late enough for a coupon, but the duration write loses first-wins.
    let now = date(2025, 3, 3).and_hms_opt(13, 30, 0).unwrap();
    let outcome = service.mark_received(1, now).await.unwrap();

    assert!(!outcome.coupon_granted);
    assert_eq!(outcome.duration, "0:02:00");
    assert_eq!(store.coupon_balance(1), 0);
    let stored = store.order(1).await.unwrap().unwrap();
    assert_eq!(stored.duration.as_deref(), Some("0:02:00"));
}

#[tokio::test]
async fn test_mark_received_on_time_grants_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.insert_customer(Customer {
        id: 1,
        account_kind: AccountKind::Personal,
        coupons: 0,
    });
    store.insert_order(
        OrderBuilder::new(1, 7, date(2025, 3, 3))
            .status(OrderStatus::Ready)
            .cost(30.0)
            .build(),
    );
    let service = OrderService::new(store.clone());

    // Exactly at the 60-minute grace bound: not eligible.
    let now = date(2025, 3, 3).and_hms_opt(12, 0, 0).unwrap();
    let outcome = service.mark_received(1, now).await.unwrap();
    assert!(!outcome.coupon_granted);
    assert_eq!(store.coupon_balance(1), 0);
}

#[tokio::test]
async fn test_pricing_consumes_exactly_one_coupon() {
    let store = Arc::new(MemoryStore::new());
    store.insert_customer(Customer {
        id: 2,
        account_kind: AccountKind::Business,
        coupons: 2,
    });
    // Long-lead business delivery, requested 4 hours out.
    let order = OrderBuilder::new(1, 7, date(2025, 3, 3))
        .customer(2)
        .status(OrderStatus::Pending)
        .times("08:00", "12:00")
        .pickup(PickupKind::Delivery)
        .build();
    let service = OrderService::new(store.clone());

    let quote = service.price_pending(&order, 100.0, 2).await.unwrap();

    // (100 + 20) * 0.9 * 0.5
    assert!((quote.total - 54.0).abs() < 1e-9);
    assert!(quote.early_discount);
    assert!(quote.coupon_applied);
    assert_eq!(store.coupon_balance(2), 1);
}
