use thiserror::Error;

/// Failure of a single job status query. Never terminal for the poller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error("Job status request failed: {0}")]
    Transport(String),
    #[error("Job status endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("Could not decode job status: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("{0}")]
    Rejected(String),
    #[error("Payment request failed: {0}")]
    Transport(String),
    #[error("Could not decode payment response: {0}")]
    Decode(String),
    #[error("Payment cancelled by user")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartError {
    #[error("Item {0} is already in the cart")]
    Duplicate(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingError {
    #[error("Order total is too large")]
    Overflow,
}
