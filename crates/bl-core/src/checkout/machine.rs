/// Position of a buyer in the checkout wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
    Review,
    Delivery,
    Payment,
    /// Payment call in flight
    Processing,
    Complete { order_id: String },
}

impl CheckoutStep {
    /// Step number shown in the progress header
    pub fn number(&self) -> u8 {
        match self {
            Self::Review => 1,
            Self::Delivery => 2,
            Self::Payment | Self::Processing => 3,
            Self::Complete { .. } => 4,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Review => "Review",
            Self::Delivery => "Delivery",
            Self::Payment => "Payment",
            Self::Processing => "Processing",
            Self::Complete { .. } => "Complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    Advance,
    Back,
    PaymentSucceeded { order_id: String },
    PaymentFailed,
}

/// `step_valid` is the verdict of the current step's validator and only
/// matters for [`CheckoutEvent::Advance`]. Events that do not apply to
/// `step` leave it unchanged.
pub fn transition(step: &CheckoutStep, event: CheckoutEvent, step_valid: bool) -> CheckoutStep {
    use CheckoutStep::*;

    match (step, event) {
        (Review, CheckoutEvent::Advance) if step_valid => Delivery,
        (Delivery, CheckoutEvent::Advance) if step_valid => Payment,
        (Payment, CheckoutEvent::Advance) if step_valid => Processing,

        (Delivery, CheckoutEvent::Back) => Review,
        (Payment, CheckoutEvent::Back) => Delivery,

        (Processing, CheckoutEvent::PaymentSucceeded { order_id }) => Complete { order_id },
        (Processing, CheckoutEvent::PaymentFailed) => Payment,

        (current, _) => current.clone(),
    }
}
