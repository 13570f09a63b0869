pub mod cart;
pub mod checkout;
pub mod error;
pub mod job;
pub mod payment;
pub mod poller;
pub mod pricing;
pub mod safe_zone;
mod model_types;

pub use model_types::JobKind;
