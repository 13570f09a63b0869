use serde::{Deserialize, Serialize};

use crate::cart::LineItem;
use crate::checkout::DeliveryMethod;
use crate::error::PricingError;

pub const DEFAULT_PLATFORM_FEE_BPS: u64 = 200;
pub const DEFAULT_SHIPPING_FEE: u64 = 149;

/// Fees applied on top of the item subtotal, in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Platform fee in basis points of the subtotal
    pub platform_fee_bps: u64,
    pub shipping_fee: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            shipping_fee: DEFAULT_SHIPPING_FEE,
        }
    }
}

impl FeeSchedule {
    /// `round(subtotal * bps / 10000)`, halves rounded up. `None` when the
    /// fee does not fit in a `u64`.
    pub fn platform_fee(&self, subtotal: u64) -> Option<u64> {
        let fee = (u128::from(subtotal) * u128::from(self.platform_fee_bps) + 5_000) / 10_000;
        u64::try_from(fee).ok()
    }

    pub fn delivery_fee(&self, method: DeliveryMethod) -> u64 {
        match method {
            DeliveryMethod::Shipping => self.shipping_fee,
            DeliveryMethod::Meetup => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: u64,
    pub platform_fee: u64,
    pub delivery_fee: u64,
    pub total: u64,
}

/// Sum of item prices, `None` on overflow
pub fn subtotal(items: &[LineItem]) -> Option<u64> {
    items
        .iter()
        .try_fold(0u64, |sum, item| sum.checked_add(item.price))
}

pub fn quote(
    items: &[LineItem],
    method: DeliveryMethod,
    fees: &FeeSchedule,
) -> Result<PriceBreakdown, PricingError> {
    let subtotal = subtotal(items).ok_or(PricingError::Overflow)?;
    let platform_fee = fees.platform_fee(subtotal).ok_or(PricingError::Overflow)?;
    let delivery_fee = fees.delivery_fee(method);
    let total = subtotal
        .checked_add(platform_fee)
        .and_then(|total| total.checked_add(delivery_fee))
        .ok_or(PricingError::Overflow)?;

    Ok(PriceBreakdown {
        subtotal,
        platform_fee,
        delivery_fee,
        total,
    })
}

/// Indian-rupee style amount for display, e.g. `₹1,23,456`
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{digits}");
    }

    let (head, last3) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    groups.push(rest);
    groups.reverse();

    format!("₹{},{last3}", groups.join(","))
}
