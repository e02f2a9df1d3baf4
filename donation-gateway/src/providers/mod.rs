//! Gateway implementations

#[cfg(feature = "paystack")]
pub mod paystack;

#[cfg(feature = "paystack")]
pub use paystack::{PAYSTACK_BASE_URL, PaystackGateway};
