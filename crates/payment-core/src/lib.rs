//! Core execution engine for cross-chain stablecoin payments.
//!
//! Routes each transfer intent to one of two settlement protocols and drives
//! that protocol's lifecycle to a terminal state: burn-and-mint bridging of
//! the native stablecoin, or a signed order handed to a relayer network.
//! Progress is published on an event bus and terminal states are archived.

pub mod builder;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod monitoring;
pub mod retry;
pub mod routing;
pub mod state;

#[cfg(test)]
mod test_support;

pub use builder::{BuilderError, PaymentBuilder, PaymentFactories};
pub use engine::{event_bus::EventBus, PaymentEngine, PaymentOutcome};
pub use error::{ErrorKind, PaymentError};
pub use monitoring::{StatusPoller, StopHandle};
pub use retry::{with_retry, RetryPolicy};
pub use routing::RouteSelector;
