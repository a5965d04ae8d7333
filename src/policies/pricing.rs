//! Pricing policy for a pending order: delivery surcharge tiers plus the two
//! stacked percentage discounts. Ordering matters and is fixed: the surcharge
//! is added first, then the multiplicative discounts apply to the sum.

use crate::models::{AccountKind, PickupKind};
use crate::policies::timing::LeadClass;

pub const SOLO_DELIVERY_SURCHARGE: f64 = 25.0;
pub const PAIR_DELIVERY_SURCHARGE: f64 = 20.0;
pub const GROUP_DELIVERY_SURCHARGE: f64 = 15.0;

/// 10% off for orders placed more than 2 hours ahead.
pub const EARLY_ORDER_FACTOR: f64 = 0.9;
/// 50% off when a loyalty coupon is redeemed.
pub const LOYALTY_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub total: f64,
    pub surcharge: f64,
    pub early_discount: bool,
    /// When true the caller must consume exactly one coupon.
    pub coupon_applied: bool,
}

/// Delivery surcharge tier. Shared delivery pricing is a business-account
/// perk; everyone else pays the solo rate.
pub fn delivery_surcharge(pickup: PickupKind, account: AccountKind, party_size: u32) -> f64 {
    match pickup {
        PickupKind::Takeaway => 0.0,
        PickupKind::Delivery => {
            if account == AccountKind::Business {
                match party_size {
                    2 => PAIR_DELIVERY_SURCHARGE,
                    n if n >= 3 => GROUP_DELIVERY_SURCHARGE,
                    _ => SOLO_DELIVERY_SURCHARGE,
                }
            } else {
                SOLO_DELIVERY_SURCHARGE
            }
        }
    }
}

/// Price a pending order from its item subtotal. At most one coupon is
/// redeemed no matter how many the customer holds.
pub fn price_order(
    subtotal: f64,
    pickup: PickupKind,
    account: AccountKind,
    party_size: u32,
    lead: LeadClass,
    coupons: i64,
) -> PriceQuote {
    let surcharge = delivery_surcharge(pickup, account, party_size);
    let mut total = subtotal + surcharge;

    let early_discount = lead == LeadClass::Long;
    if early_discount {
        total *= EARLY_ORDER_FACTOR;
    }

    let coupon_applied = coupons > 0;
    if coupon_applied {
        total *= LOYALTY_FACTOR;
    }

    PriceQuote {
        total,
        surcharge,
        early_discount,
        coupon_applied,
    }
}
