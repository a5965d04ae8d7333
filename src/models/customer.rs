use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Personal,
    Business,
}

impl AccountKind {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "Personal" => Ok(AccountKind::Personal),
            "Business" => Ok(AccountKind::Business),
            other => Err(AppError::ValidationError(format!(
                "Unknown account kind: {other}"
            ))),
        }
    }
}

/// Customer record as seen by the pricing and receipt flows. Coupons are a
/// non-negative loyalty counter: +1 on an eligible late receipt, -1 when the
/// 50% loyalty discount is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub account_kind: AccountKind,
    pub coupons: i64,
}
