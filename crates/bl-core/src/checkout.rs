//! Buyer checkout wizard: Review → Delivery → Payment → Processing →
//! Complete, falling back to Payment when the payment call fails.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cart::{Cart, LineItem};
use crate::error::PricingError;
use crate::payment::{DeliverySelection, OrderConfirmation, OrderRequest, PaymentGateway};
use crate::pricing::{self, FeeSchedule, PriceBreakdown};

mod form;
mod machine;

pub use form::{
    CardDetails, DeliveryMethod, MeetupDetails, PaymentMethod, ShippingAddress,
    MIN_CARD_NUMBER_LEN, MIN_CVV_LEN,
};
pub use machine::{CheckoutEvent, CheckoutStep, transition};

/// Client-side state of one purchase. Form values survive failed payments;
/// they are frozen while the payment call runs and after completion.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    items: Vec<LineItem>,
    fees: FeeSchedule,
    delivery_method: DeliveryMethod,
    meetup: MeetupDetails,
    shipping: ShippingAddress,
    payment_method: PaymentMethod,
    card: CardDetails,
    step: CheckoutStep,
    last_error: Option<String>,
    confirmation: Option<OrderConfirmation>,
}

impl CheckoutSession {
    pub fn new(items: Vec<LineItem>, fees: FeeSchedule) -> Self {
        Self {
            items,
            fees,
            delivery_method: DeliveryMethod::default(),
            meetup: MeetupDetails::default(),
            shipping: ShippingAddress::default(),
            payment_method: PaymentMethod::default(),
            card: CardDetails::default(),
            step: CheckoutStep::Review,
            last_error: None,
            confirmation: None,
        }
    }

    pub fn from_cart(cart: &Cart, fees: FeeSchedule) -> Self {
        Self::new(cart.items().to_vec(), fees)
    }

    /// Single-listing "buy now" checkout
    pub fn for_listing(item: LineItem, fees: FeeSchedule) -> Self {
        Self::new(vec![item], fees)
    }

    pub fn step(&self) -> &CheckoutStep {
        &self.step
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        self.delivery_method
    }

    pub fn meetup(&self) -> &MeetupDetails {
        &self.meetup
    }

    pub fn shipping(&self) -> &ShippingAddress {
        &self.shipping
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn card(&self) -> &CardDetails {
        &self.card
    }

    /// Message of the last failed payment attempt
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn confirmation(&self) -> Option<&OrderConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn order_id(&self) -> Option<&str> {
        match &self.step {
            CheckoutStep::Complete { order_id } => Some(order_id),
            _ => None,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.step == CheckoutStep::Processing
    }

    pub fn is_complete(&self) -> bool {
        self.step.is_terminal()
    }

    fn is_editable(&self) -> bool {
        !self.is_processing() && !self.is_complete()
    }

    /// Derived from the current items and delivery method on every call
    pub fn price(&self) -> Result<PriceBreakdown, PricingError> {
        pricing::quote(&self.items, self.delivery_method, &self.fees)
    }

    pub fn set_delivery_method(&mut self, method: DeliveryMethod) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.delivery_method = method;
        true
    }

    pub fn meetup_mut(&mut self) -> Option<&mut MeetupDetails> {
        self.is_editable().then_some(&mut self.meetup)
    }

    pub fn shipping_mut(&mut self) -> Option<&mut ShippingAddress> {
        self.is_editable().then_some(&mut self.shipping)
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.payment_method = method;
        true
    }

    pub fn card_mut(&mut self) -> Option<&mut CardDetails> {
        self.is_editable().then_some(&mut self.card)
    }

    pub fn remove_item(&mut self, id: &str) -> Option<LineItem> {
        if !self.is_editable() {
            return None;
        }
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Verdict of the current step's validator
    pub fn can_proceed(&self) -> bool {
        match self.step {
            CheckoutStep::Review => true,
            CheckoutStep::Delivery => match self.delivery_method {
                DeliveryMethod::Meetup => self.meetup.is_complete(),
                DeliveryMethod::Shipping => self.shipping.is_complete(),
            },
            CheckoutStep::Payment => match self.payment_method {
                PaymentMethod::Card => self.card.is_complete(),
                PaymentMethod::StoredCredit => true,
            },
            CheckoutStep::Processing | CheckoutStep::Complete { .. } => false,
        }
    }

    pub fn back(&mut self) -> &CheckoutStep {
        let next = transition(&self.step, CheckoutEvent::Back, true);
        if next != self.step {
            debug!(from = self.step.label(), to = next.label(), "Checkout back");
            self.step = next;
        }
        &self.step
    }

    /// Moves to the next step when the current one validates. From Payment
    /// this places the order through `payments` and lands on either Complete
    /// or, with [`last_error`](Self::last_error) set, back on Payment.
    ///
    /// Dropping the returned future while the payment call is pending leaves
    /// the session in Processing.
    pub async fn advance<G>(&mut self, payments: &G) -> &CheckoutStep
    where
        G: PaymentGateway + ?Sized,
    {
        let next = transition(&self.step, CheckoutEvent::Advance, self.can_proceed());
        if next == self.step {
            debug!(step = self.step.label(), "Checkout advance blocked");
            return &self.step;
        }

        info!(from = self.step.label(), to = next.label(), "Checkout advance");
        self.step = next;

        if self.step == CheckoutStep::Processing {
            let event = self.pay(payments).await;
            self.step = transition(&self.step, event, true);
        }

        &self.step
    }

    async fn pay<G>(&mut self, payments: &G) -> CheckoutEvent
    where
        G: PaymentGateway + ?Sized,
    {
        self.last_error = None;
        let request = match self.order_request() {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Cannot price order");
                self.last_error = Some(err.to_string());
                return CheckoutEvent::PaymentFailed;
            }
        };
        info!(
            receipt = %request.receipt,
            total = request.price.total,
            method = request.payment_method.label(),
            "Placing order"
        );

        match payments.place_order(&request).await {
            Ok(confirmation) => {
                info!(order_id = %confirmation.order_id, "Order placed");
                let order_id = confirmation.order_id.clone();
                self.confirmation = Some(confirmation);
                CheckoutEvent::PaymentSucceeded { order_id }
            }
            Err(err) => {
                warn!(error = %err, "Payment failed");
                self.last_error = Some(err.to_string());
                CheckoutEvent::PaymentFailed
            }
        }
    }

    fn order_request(&self) -> Result<OrderRequest, PricingError> {
        let delivery = match self.delivery_method {
            DeliveryMethod::Meetup => DeliverySelection::Meetup(self.meetup.clone()),
            DeliveryMethod::Shipping => DeliverySelection::Shipping(self.shipping.clone()),
        };

        Ok(OrderRequest {
            receipt: Uuid::new_v4(),
            items: self.items.clone(),
            delivery,
            payment_method: self.payment_method,
            price: self.price()?,
        })
    }
}
