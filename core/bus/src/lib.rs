//! Topic-routed message bus abstraction for the incident pipeline.
//!
//! [`AmqpBus`] is the production transport over `lapin`; [`InMemoryBus`] is
//! an in-process double agents use in their own unit tests so no broker is
//! required, per the injectable-trait-object approach called for in the
//! pipeline design notes.

mod amqp;
mod delivery;
mod error;
mod memory;
pub mod topology;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use amqp::AmqpBus;
pub use delivery::{Acker, Delivery};
pub use error::{BusError, BusResult};
pub use memory::InMemoryBus;
pub use topology::QueueSpec;

/// Transport-agnostic publish/consume contract. Agent message loops are
/// written against this trait, never against `lapin` directly, so they can
/// run against [`InMemoryBus`] in tests.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: Vec<u8>) -> BusResult<()>;

    async fn consume(
        &self,
        spec: QueueSpec,
        consumer_tag: &str,
    ) -> BusResult<BoxStream<'static, BusResult<Delivery>>>;
}

/// Serialize `value` as JSON and publish it under `exchange`/`routing_key`.
pub async fn publish_json<T: serde::Serialize + Sync>(
    bus: &dyn Bus,
    exchange: &str,
    routing_key: &str,
    value: &T,
) -> BusResult<()> {
    let payload = serde_json::to_vec(value).map_err(BusError::Decode)?;
    bus.publish(exchange, routing_key, payload).await
}
