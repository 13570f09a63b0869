use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::LineItem;
use crate::checkout::{DeliveryMethod, MeetupDetails, PaymentMethod, ShippingAddress};
use crate::error::PaymentError;
use crate::pricing::PriceBreakdown;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum DeliverySelection {
    Meetup(MeetupDetails),
    Shipping(ShippingAddress),
}

impl DeliverySelection {
    pub fn method(&self) -> DeliveryMethod {
        match self {
            Self::Meetup(_) => DeliveryMethod::Meetup,
            Self::Shipping(_) => DeliveryMethod::Shipping,
        }
    }
}

/// Everything the payment backend needs to open an order. Card data is
/// never part of it; cards are collected by the hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub receipt: Uuid,
    pub items: Vec<LineItem>,
    pub delivery: DeliverySelection,
    pub payment_method: PaymentMethod,
    pub price: PriceBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Card order opened by the backend, waiting for the buyer to pay through
/// the hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCardOrder {
    /// Backend record id, echoed back on verification
    pub id: String,
    pub order_id: String,
    pub razorpay_order_id: String,
    /// In paise
    pub amount: u64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
}

/// Ids the hosted checkout hands back after a successful card payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAuthorization {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Hosted card checkout. Resolves once the buyer has paid, or with
/// [`PaymentError::Cancelled`] when they walk away.
#[async_trait]
pub trait CardCheckout: Send + Sync {
    async fn authorize(&self, order: &PendingCardOrder) -> Result<CardAuthorization, PaymentError>;
}

/// Create-order collaborator. One call per payment attempt; callers do not retry.
/// Card payments only succeed once the backend has verified them.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderConfirmation, PaymentError>;
}
