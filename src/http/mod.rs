//! Outbound HTTP delivery.

pub mod deliverer;

pub use deliverer::{Deliverer, DeliveryOutcome, ReqwestDeliverer};
