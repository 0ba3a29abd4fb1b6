use crate::delivery::{Acker, Delivery};
use crate::error::{BusError, BusResult};
use crate::topology::{QueueSpec, ALL_QUEUES};
use crate::Bus;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// In-process stand-in for [`AmqpBus`](crate::AmqpBus), used by agent unit
/// tests. Binds the same fixed exchange/routing-key topology as the real
/// broker (see [`topology::ALL_QUEUES`]) but moves bytes over channels
/// instead of a socket; ack/nack are no-ops.
pub struct InMemoryBus {
    senders: HashMap<&'static str, mpsc::UnboundedSender<(String, Vec<u8>)>>,
    receivers: Mutex<HashMap<&'static str, Option<mpsc::UnboundedReceiver<(String, Vec<u8>)>>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for spec in ALL_QUEUES {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(spec.queue, tx);
            receivers.insert(spec.queue, Some(rx));
        }
        Self {
            senders,
            receivers: Mutex::new(receivers),
        }
    }

    fn queue_for(exchange: &str, routing_key: &str) -> Option<&'static QueueSpec> {
        ALL_QUEUES
            .iter()
            .find(|spec| spec.exchange == exchange && spec.routing_key == routing_key)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: Vec<u8>) -> BusResult<()> {
        let spec = Self::queue_for(exchange, routing_key).ok_or_else(|| {
            use serde::de::Error as _;
            BusError::Decode(serde_json::Error::custom(format!(
                "no queue bound to {exchange}/{routing_key}"
            )))
        })?;
        let sender = self.senders.get(spec.queue).expect("sender registered at construction");
        let _ = sender.send((routing_key.to_string(), payload));
        Ok(())
    }

    async fn consume(
        &self,
        spec: QueueSpec,
        _consumer_tag: &str,
    ) -> BusResult<BoxStream<'static, BusResult<Delivery>>> {
        let receiver = self
            .receivers
            .lock()
            .expect("receivers mutex poisoned")
            .get_mut(spec.queue)
            .and_then(|slot| slot.take())
            .expect("queue already consumed or unknown");

        let stream = futures::stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|(routing_key, payload)| {
                (Ok(Delivery::new(routing_key, payload, Acker::Noop)), rx)
            })
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::INCIDENTS_NEW;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn publish_then_consume_round_trips_payload() {
        let bus = InMemoryBus::new();
        bus.publish(INCIDENTS_NEW.exchange, INCIDENTS_NEW.routing_key, b"hello".to_vec())
            .await
            .unwrap();

        let mut stream = bus.consume(INCIDENTS_NEW, "test-consumer").await.unwrap();
        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.payload, b"hello");
        delivery.ack().await.unwrap();
    }
}
