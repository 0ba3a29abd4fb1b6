use crate::error::{BusError, BusResult};
use lapin::options::{BasicAckOptions, BasicNackOptions};

/// Acknowledgement handle, abstracted so the in-memory test double can hand
/// out deliveries without a real broker underneath.
pub enum Acker {
    Amqp(lapin::acker::Acker),
    /// Used by `InMemoryBus` in tests; ack/nack are no-ops.
    Noop,
}

impl Acker {
    pub async fn ack(&self) -> BusResult<()> {
        match self {
            Acker::Amqp(a) => a.ack(BasicAckOptions::default()).await.map_err(BusError::Ack),
            Acker::Noop => Ok(()),
        }
    }

    /// Negative-acknowledge and requeue, for `TransientExternal` failures.
    pub async fn nack_requeue(&self) -> BusResult<()> {
        match self {
            Acker::Amqp(a) => a
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue: true,
                })
                .await
                .map_err(BusError::Ack),
            Acker::Noop => Ok(()),
        }
    }

    /// Negative-acknowledge without requeue. The queue's configured
    /// dead-letter exchange routes the message to its DLQ.
    pub async fn nack_dead_letter(&self) -> BusResult<()> {
        match self {
            Acker::Amqp(a) => a
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue: false,
                })
                .await
                .map_err(BusError::Ack),
            Acker::Noop => Ok(()),
        }
    }
}

/// A message pulled off a queue, not yet acknowledged.
pub struct Delivery {
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub(crate) acker: Acker,
}

impl Delivery {
    pub fn new(routing_key: impl Into<String>, payload: Vec<u8>, acker: Acker) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload,
            acker,
        }
    }

    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> BusResult<T> {
        serde_json::from_slice(&self.payload).map_err(BusError::Decode)
    }

    pub async fn ack(&self) -> BusResult<()> {
        self.acker.ack().await
    }

    pub async fn nack_requeue(&self) -> BusResult<()> {
        self.acker.nack_requeue().await
    }

    pub async fn nack_dead_letter(&self) -> BusResult<()> {
        self.acker.nack_dead_letter().await
    }
}
