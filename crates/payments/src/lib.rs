//! `meshmart-payments` — the payment-notification state machine.
//!
//! The callback is a trusted-webhook stub, not a gateway protocol: it tells
//! us an external payment either succeeded or failed, possibly more than
//! once (at-least-once delivery). This crate turns that into exactly one
//! order status transition and exactly one entitlement-issuance pass.

pub mod processor;

pub use processor::{
    CallbackDisposition, CallbackResult, PaymentCallback, PaymentOutcome, PaymentProcessor,
};
