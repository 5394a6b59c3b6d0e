pub mod cancellation;
pub mod client;
pub mod error;
pub mod id;
pub mod money;
pub mod payment;
