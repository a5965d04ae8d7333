//! Live order flow: pricing a pending order and marking an order received.
//! Both lean on the pure policies; this service owns the store side effects
//! (the single duration write, coupon grant and coupon consumption).

use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderStatus};
use crate::policies::pricing::{self, PriceQuote};
use crate::policies::timing;
use crate::store::ReportStore;
use chrono::NaiveDateTime;
use std::sync::Arc;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn ReportStore>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptOutcome {
    pub duration: String,
    pub coupon_granted: bool,
}

impl OrderService {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// Mark an order received at `now`: record the elapsed duration (exactly
    /// once) and grant one loyalty coupon when the delivery ran late enough.
    /// Calling this on an already-Received order changes nothing.
    pub async fn mark_received(&self, order_id: i64, now: NaiveDateTime) -> AppResult<ReceiptOutcome> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id}")))?;

        if order.status == OrderStatus::Received {
            return Ok(ReceiptOutcome {
                duration: order.duration.unwrap_or_default(),
                coupon_granted: false,
            });
        }

        let placed_at = order.placed_at()?;
        let requested_at = order.requested_at()?;

        let duration = timing::format_elapsed(requested_at, now);
        if !self.store.set_order_received(order_id, &duration).await? {
            // Another receipt got there first; its duration and coupon stand.
            let stored = self
                .store
                .order(order_id)
                .await?
                .and_then(|o| o.duration)
                .unwrap_or(duration);
            return Ok(ReceiptOutcome {
                duration: stored,
                coupon_granted: false,
            });
        }

        let coupon_granted = timing::coupon_eligible(placed_at, requested_at, now);
        if coupon_granted {
            self.store.grant_coupon(order.customer_id).await?;
            log::info!(
                "Customer {} earned a coupon for late order {order_id}",
                order.customer_id
            );
        }

        Ok(ReceiptOutcome {
            duration,
            coupon_granted,
        })
    }

    /// Price a pending order from its item subtotal, applying the delivery
    /// surcharge tier and the stacked discounts. Consumes exactly one coupon
    /// when the loyalty discount fires, however many the customer holds.
    pub async fn price_pending(
        &self,
        order: &Order,
        subtotal: f64,
        party_size: u32,
    ) -> AppResult<PriceQuote> {
        let customer = self
            .store
            .customer(order.customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {}", order.customer_id)))?;

        let lead = timing::lead_class(order.placed_at()?, order.requested_at()?);
        let quote = pricing::price_order(
            subtotal,
            order.pickup,
            customer.account_kind,
            party_size,
            lead,
            customer.coupons,
        );

        if quote.coupon_applied && !self.store.consume_coupon(order.customer_id).await? {
            // Balance changed between read and redeem; price without it.
            return Ok(pricing::price_order(
                subtotal,
                order.pickup,
                customer.account_kind,
                party_size,
                lead,
                0,
            ));
        }

        Ok(quote)
    }
}
