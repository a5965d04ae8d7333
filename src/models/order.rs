use crate::error::{AppError, AppResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Takeaway,
    Delivery,
}

impl PickupKind {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "Takeaway" => Ok(PickupKind::Takeaway),
            "Delivery" => Ok(PickupKind::Delivery),
            other => Err(AppError::ValidationError(format!(
                "Unknown pickup kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Ready,
    Received,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Received => "Received",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Ready" => Ok(OrderStatus::Ready),
            "Received" => Ok(OrderStatus::Received),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::ValidationError(format!(
                "Unknown order status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Salad,
    Sweets,
    Drinks,
    MainMeal,
}

impl ItemCategory {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "Salad" => Ok(ItemCategory::Salad),
            "Sweets" => Ok(ItemCategory::Sweets),
            "Drinks" => Ok(ItemCategory::Drinks),
            "MainMeal" => Ok(ItemCategory::MainMeal),
            other => Err(AppError::ValidationError(format!(
                "Unknown item category: {other}"
            ))),
        }
    }
}

/// One menu selection inside an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub category: ItemCategory,
    pub quantity: i64,
    pub unit_cost: f64,
}

/// A placed order. Times of day are kept as raw `HH:MM` strings, matching the
/// store layout; they are parsed on use, which is where malformed input
/// surfaces as a `ValidationError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub restaurant_id: i64,
    pub customer_id: i64,
    pub placed_date: NaiveDate,
    pub placed_time: String,
    pub requested_date: NaiveDate,
    pub requested_time: String,
    pub pickup: PickupKind,
    pub status: OrderStatus,
    /// Post-discount cost, surcharge included.
    pub cost: f64,
    /// Signed `D:HH:MM` elapsed time past the requested fulfillment time,
    /// written exactly once when the order is marked Received.
    pub duration: Option<String>,
    pub lines: Vec<OrderLine>,
}

fn parse_hh_mm(time: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| AppError::ValidationError(format!("Unparsable HH:MM time: {time:?}")))
}

impl Order {
    /// When the order was placed.
    pub fn placed_at(&self) -> AppResult<NaiveDateTime> {
        Ok(self.placed_date.and_time(parse_hh_mm(&self.placed_time)?))
    }

    /// When the customer asked for the order to be fulfilled.
    pub fn requested_at(&self) -> AppResult<NaiveDateTime> {
        Ok(self
            .requested_date
            .and_time(parse_hh_mm(&self.requested_time)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_times(placed: &str, requested: &str) -> Order {
        Order {
            id: 1,
            restaurant_id: 1,
            customer_id: 1,
            placed_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            placed_time: placed.to_string(),
            requested_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            requested_time: requested.to_string(),
            pickup: PickupKind::Takeaway,
            status: OrderStatus::Pending,
            cost: 0.0,
            duration: None,
            lines: vec![],
        }
    }

    #[test]
    fn test_parses_valid_times() {
        let order = order_with_times("09:30", "11:00");
        assert!(order.placed_at().is_ok());
        assert!(order.requested_at().is_ok());
    }

    #[test]
    fn test_rejects_malformed_time() {
        let order = order_with_times("9h30", "11:00");
        assert!(matches!(
            order.placed_at(),
            Err(crate::error::AppError::ValidationError(_))
        ));
    }
}
