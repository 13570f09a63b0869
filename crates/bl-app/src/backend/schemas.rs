use bl_core::checkout::{DeliveryMethod, MeetupDetails, ShippingAddress};
use bl_core::payment::{
    CardAuthorization, DeliverySelection, OrderConfirmation, OrderRequest, PendingCardOrder,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListingMetadata {
    pub title: String,
    pub category: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submit3dRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
    /// Base64 encoded photos of the item
    pub images: Vec<String>,
    pub metadata: ListingMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobCreateResponse {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds until the queue reaches this job
    #[serde(default)]
    pub estimated_wait: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody<'a> {
    pub listing_id: &'a str,
    pub delivery_method: &'static str,
    pub delivery_address: Option<&'a ShippingAddress>,
    pub meetup: Option<&'a MeetupDetails>,
    pub receipt: String,
    pub expected_total: u64,
}

impl<'a> CreateOrderBody<'a> {
    /// `None` unless the request carries exactly one item
    pub fn from_request(request: &'a OrderRequest) -> Option<Self> {
        let [item] = request.items.as_slice() else {
            return None;
        };
        let (delivery_address, meetup) = match &request.delivery {
            DeliverySelection::Shipping(address) => (Some(address), None),
            DeliverySelection::Meetup(details) => (None, Some(details)),
        };

        Some(Self {
            listing_id: &item.id,
            delivery_method: wire_delivery_method(request.delivery.method()),
            delivery_address,
            meetup,
            receipt: format!("order_{}", request.receipt.simple()),
            expected_total: request.price.total,
        })
    }
}

/// Backend courier names
fn wire_delivery_method(method: DeliveryMethod) -> &'static str {
    match method {
        DeliveryMethod::Meetup => "meetup",
        DeliveryMethod::Shipping => "shiprocket",
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    pub order: OrderConfirmation,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardOrderResponse {
    pub order: PendingCardOrder,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentBody<'a> {
    #[serde(flatten)]
    pub authorization: &'a CardAuthorization,
    /// Backend record id of the pending order
    pub order_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedOrder {
    pub order_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentResponse {
    pub order: VerifiedOrder,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
