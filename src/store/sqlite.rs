//! SQLite-backed [`ReportStore`].
//!
//! Dates are stored as `YYYY-MM-DD` text, times of day as raw `HH:MM` text,
//! so period scans are plain range predicates on the placement date.

use crate::error::{AppError, AppResult};
use crate::models::{
    AccountKind, Customer, IncomeReport, ItemCategory, Order, OrderLine, OrderMixReport,
    OrderStatus, PerformanceReport, PickupKind, Quarter, QuarterReport, ReportFacet, ReportPeriod,
};
use crate::store::ReportStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::ValidationError(format!("Invalid period {year}-{month}")))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::ValidationError(format!("Invalid period {year}-{month}")))?;
    Ok((start, end))
}

fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Unparsable date: {s:?}")))
}

fn row_to_order(row: &SqliteRow) -> AppResult<Order> {
    Ok(Order {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        customer_id: row.try_get("customer_id")?,
        placed_date: parse_date(row.try_get::<String, _>("placed_date")?.as_str())?,
        placed_time: row.try_get("placed_time")?,
        requested_date: parse_date(row.try_get::<String, _>("requested_date")?.as_str())?,
        requested_time: row.try_get("requested_time")?,
        pickup: PickupKind::parse(row.try_get::<String, _>("pickup")?.as_str())?,
        status: OrderStatus::parse(row.try_get::<String, _>("status")?.as_str())?,
        cost: row.try_get("cost")?,
        duration: row.try_get("duration")?,
        lines: Vec::new(),
    })
}

fn row_to_line(row: &SqliteRow) -> AppResult<OrderLine> {
    Ok(OrderLine {
        category: ItemCategory::parse(row.try_get::<String, _>("category")?.as_str())?,
        quantity: row.try_get("quantity")?,
        unit_cost: row.try_get("unit_cost")?,
    })
}

impl SqliteStore {
    async fn lines_for_order(&self, order_id: i64) -> AppResult<Vec<OrderLine>> {
        let rows = sqlx::query(
            "SELECT category, quantity, unit_cost FROM order_lines WHERE order_id = ? ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_line).collect()
    }
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn orders_in_period(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Vec<Order>> {
        let (start, end) = month_bounds(year, month)?;

        let rows = sqlx::query(
            "SELECT id, restaurant_id, customer_id, placed_date, placed_time, \
             requested_date, requested_time, pickup, status, cost, duration \
             FROM orders \
             WHERE restaurant_id = ? AND placed_date >= ? AND placed_date < ? \
             ORDER BY id",
        )
        .bind(restaurant_id)
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        let mut by_id: HashMap<i64, usize> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let order = row_to_order(row)?;
            by_id.insert(order.id, orders.len());
            orders.push(order);
        }

        let line_rows = sqlx::query(
            "SELECT order_id, category, quantity, unit_cost FROM order_lines \
             WHERE order_id IN (SELECT id FROM orders \
             WHERE restaurant_id = ? AND placed_date >= ? AND placed_date < ?) \
             ORDER BY id",
        )
        .bind(restaurant_id)
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(&self.pool)
        .await?;

        for row in &line_rows {
            let order_id: i64 = row.try_get("order_id")?;
            if let Some(&idx) = by_id.get(&order_id) {
                orders[idx].lines.push(row_to_line(row)?);
            }
        }

        Ok(orders)
    }

    async fn restaurant_ids_with_orders(&self) -> AppResult<Vec<i64>> {
        let rows = sqlx::query("SELECT DISTINCT restaurant_id FROM orders ORDER BY restaurant_id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get("restaurant_id").map_err(AppError::from))
            .collect()
    }

    async fn upsert_report(&self, facet: &ReportFacet) -> AppResult<()> {
        match facet {
            ReportFacet::Income(r) => {
                sqlx::query(
                    "INSERT INTO income_reports \
                     (restaurant_id, year, month, total_revenue, salad_revenue, \
                      sweets_revenue, drinks_revenue, main_meal_revenue) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(restaurant_id, year, month) DO UPDATE SET \
                     total_revenue = excluded.total_revenue, \
                     salad_revenue = excluded.salad_revenue, \
                     sweets_revenue = excluded.sweets_revenue, \
                     drinks_revenue = excluded.drinks_revenue, \
                     main_meal_revenue = excluded.main_meal_revenue",
                )
                .bind(r.period.restaurant_id)
                .bind(r.period.year)
                .bind(r.period.month as i64)
                .bind(r.total_revenue)
                .bind(r.salad_revenue)
                .bind(r.sweets_revenue)
                .bind(r.drinks_revenue)
                .bind(r.main_meal_revenue)
                .execute(&self.pool)
                .await?;
            }
            ReportFacet::OrderMix(r) => {
                sqlx::query(
                    "INSERT INTO order_mix_reports \
                     (restaurant_id, year, month, total_orders, salad_orders, \
                      sweets_orders, drinks_orders, main_meal_orders) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(restaurant_id, year, month) DO UPDATE SET \
                     total_orders = excluded.total_orders, \
                     salad_orders = excluded.salad_orders, \
                     sweets_orders = excluded.sweets_orders, \
                     drinks_orders = excluded.drinks_orders, \
                     main_meal_orders = excluded.main_meal_orders",
                )
                .bind(r.period.restaurant_id)
                .bind(r.period.year)
                .bind(r.period.month as i64)
                .bind(r.total_orders)
                .bind(r.salad_orders)
                .bind(r.sweets_orders)
                .bind(r.drinks_orders)
                .bind(r.main_meal_orders)
                .execute(&self.pool)
                .await?;
            }
            ReportFacet::Performance(r) => {
                sqlx::query(
                    "INSERT INTO performance_reports \
                     (restaurant_id, year, month, on_time_orders, late_orders, average_delay) \
                     VALUES (?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(restaurant_id, year, month) DO UPDATE SET \
                     on_time_orders = excluded.on_time_orders, \
                     late_orders = excluded.late_orders, \
                     average_delay = excluded.average_delay",
                )
                .bind(r.period.restaurant_id)
                .bind(r.period.year)
                .bind(r.period.month as i64)
                .bind(r.on_time_orders)
                .bind(r.late_orders)
                .bind(r.average_delay.as_str())
                .execute(&self.pool)
                .await?;
            }
            ReportFacet::Quarter(r) => {
                // Totals and histogram land together or not at all.
                let mut tx = self.pool.begin().await?;
                sqlx::query(
                    "INSERT INTO quarter_reports \
                     (restaurant_id, year, quarter, daily_average_orders, total_revenue) \
                     VALUES (?, ?, ?, ?, ?) \
                     ON CONFLICT(restaurant_id, year, quarter) DO UPDATE SET \
                     daily_average_orders = excluded.daily_average_orders, \
                     total_revenue = excluded.total_revenue",
                )
                .bind(r.restaurant_id)
                .bind(r.year)
                .bind(r.quarter.as_str())
                .bind(r.daily_average_orders)
                .bind(r.total_revenue)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "DELETE FROM quarter_daily_orders \
                     WHERE restaurant_id = ? AND year = ? AND quarter = ?",
                )
                .bind(r.restaurant_id)
                .bind(r.year)
                .bind(r.quarter.as_str())
                .execute(&mut *tx)
                .await?;

                for (date, count) in &r.daily_orders {
                    sqlx::query(
                        "INSERT INTO quarter_daily_orders \
                         (restaurant_id, year, quarter, day, order_count) \
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(r.restaurant_id)
                    .bind(r.year)
                    .bind(r.quarter.as_str())
                    .bind(date.to_string())
                    .bind(*count)
                    .execute(&mut *tx)
                    .await?;
                }

                tx.commit().await?;
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
        let row = sqlx::query(
            "SELECT total_revenue, salad_revenue, sweets_revenue, drinks_revenue, \
             main_meal_revenue FROM income_reports \
             WHERE restaurant_id = ? AND year = ? AND month = ?",
        )
        .bind(restaurant_id)
        .bind(year)
        .bind(month as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(IncomeReport {
                period: ReportPeriod {
                    restaurant_id,
                    year,
                    month,
                },
                total_revenue: row.try_get("total_revenue")?,
                salad_revenue: row.try_get("salad_revenue")?,
                sweets_revenue: row.try_get("sweets_revenue")?,
                drinks_revenue: row.try_get("drinks_revenue")?,
                main_meal_revenue: row.try_get("main_meal_revenue")?,
            })
        })
        .transpose()
    }

    async fn order_mix_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<OrderMixReport>> {
        let row = sqlx::query(
            "SELECT total_orders, salad_orders, sweets_orders, drinks_orders, \
             main_meal_orders FROM order_mix_reports \
             WHERE restaurant_id = ? AND year = ? AND month = ?",
        )
        .bind(restaurant_id)
        .bind(year)
        .bind(month as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(OrderMixReport {
                period: ReportPeriod {
                    restaurant_id,
                    year,
                    month,
                },
                total_orders: row.try_get("total_orders")?,
                salad_orders: row.try_get("salad_orders")?,
                sweets_orders: row.try_get("sweets_orders")?,
                drinks_orders: row.try_get("drinks_orders")?,
                main_meal_orders: row.try_get("main_meal_orders")?,
            })
        })
        .transpose()
    }

    async fn performance_report(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<Option<PerformanceReport>> {
        let row = sqlx::query(
            "SELECT on_time_orders, late_orders, average_delay FROM performance_reports \
             WHERE restaurant_id = ? AND year = ? AND month = ?",
        )
        .bind(restaurant_id)
        .bind(year)
        .bind(month as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(PerformanceReport {
                period: ReportPeriod {
                    restaurant_id,
                    year,
                    month,
                },
                on_time_orders: row.try_get("on_time_orders")?,
                late_orders: row.try_get("late_orders")?,
                average_delay: row.try_get("average_delay")?,
            })
        })
        .transpose()
    }

    async fn quarter_report(
        &self,
        restaurant_id: i64,
        year: i32,
        quarter: Quarter,
    ) -> AppResult<Option<QuarterReport>> {
        let row = sqlx::query(
            "SELECT daily_average_orders, total_revenue FROM quarter_reports \
             WHERE restaurant_id = ? AND year = ? AND quarter = ?",
        )
        .bind(restaurant_id)
        .bind(year)
        .bind(quarter.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let day_rows = sqlx::query(
            "SELECT day, order_count FROM quarter_daily_orders \
             WHERE restaurant_id = ? AND year = ? AND quarter = ?",
        )
        .bind(restaurant_id)
        .bind(year)
        .bind(quarter.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut daily_orders = BTreeMap::new();
        for day_row in &day_rows {
            let day = parse_date(day_row.try_get::<String, _>("day")?.as_str())?;
            daily_orders.insert(day, day_row.try_get::<i64, _>("order_count")?);
        }

        Ok(Some(QuarterReport {
            restaurant_id,
            year,
            quarter,
            daily_average_orders: row.try_get("daily_average_orders")?,
            total_revenue: row.try_get("total_revenue")?,
            daily_orders,
        }))
    }

    async fn record_quarter_contribution(
        &self,
        restaurant_id: i64,
        year: i32,
        month: u32,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO quarter_applied_months (restaurant_id, year, month) \
             VALUES (?, ?, ?)",
        )
        .bind(restaurant_id)
        .bind(year)
        .bind(month as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn order(&self, order_id: i64) -> AppResult<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, customer_id, placed_date, placed_time, \
             requested_date, requested_time, pickup, status, cost, duration \
             FROM orders WHERE id = ?",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = row_to_order(&row)?;
        order.lines = self.lines_for_order(order_id).await?;
        Ok(Some(order))
    }

    async fn set_order_received(&self, order_id: i64, duration: &str) -> AppResult<bool> {
        // The duration-is-null guard makes the write first-wins.
        let result = sqlx::query(
            "UPDATE orders SET status = ?, duration = ? \
             WHERE id = ? AND duration IS NULL",
        )
        .bind(OrderStatus::Received.as_str())
        .bind(duration)
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn customer(&self, customer_id: i64) -> AppResult<Option<Customer>> {
        let row = sqlx::query("SELECT account_kind, coupons FROM customers WHERE id = ?")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Customer {
                id: customer_id,
                account_kind: AccountKind::parse(
                    row.try_get::<String, _>("account_kind")?.as_str(),
                )?,
                coupons: row.try_get("coupons")?,
            })
        })
        .transpose()
    }

    async fn grant_coupon(&self, customer_id: i64) -> AppResult<()> {
        let result = sqlx::query("UPDATE customers SET coupons = coupons + 1 WHERE id = ?")
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Customer {customer_id}")));
        }
        Ok(())
    }

    async fn consume_coupon(&self, customer_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE customers SET coupons = coupons - 1 WHERE id = ? AND coupons > 0",
        )
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
