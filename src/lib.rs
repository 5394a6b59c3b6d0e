pub mod adapters;
pub mod config;
pub mod domain;
pub mod services;

pub use {
    config::BridgeConfig,
    domain::error::{BridgeError, ProviderError},
    services::{
        bridge::PaymentBridge,
        handle::PaymentFuture,
        pool::SchedulingPool,
        tracker::ShutdownReport,
    },
};
