//! HMAC signing for outbound webhook payloads.

pub mod signer;

pub use signer::{sign, verify, SIGNATURE_PREFIX};
