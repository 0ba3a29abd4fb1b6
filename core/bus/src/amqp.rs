use crate::delivery::{Acker, Delivery};
use crate::error::{BusError, BusResult};
use crate::topology::{QueueSpec, ALL_QUEUES, DEAD_LETTER_EXCHANGE, TOPIC_EXCHANGES};
use crate::Bus;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Connection, ConnectionProperties, ExchangeKind};
use tracing::{info, warn};

/// AMQP 0-9-1 transport, backed by `lapin`, implementing the broker contract
/// from spec §5/§6: durable topic exchanges, durable queues, manual ack,
/// prefetch=1 per consumer, dead-letter routing.
pub struct AmqpBus {
    connection: Connection,
}

impl AmqpBus {
    pub async fn connect(amqp_url: &str) -> BusResult<Self> {
        let connection = Connection::connect(
            amqp_url,
            ConnectionProperties::default()
                .with_executor(tokio_executor_trait::Tokio::current())
                .with_reactor(tokio_reactor_trait::Tokio),
        )
        .await
        .map_err(BusError::Connect)?;
        info!("connected to amqp broker");
        Ok(Self { connection })
    }

    /// Declare every exchange, queue, and binding the pipeline needs,
    /// including the dead-letter exchange and per-queue DLQs. Idempotent:
    /// safe to call on every agent startup.
    pub async fn declare_topology(&self) -> BusResult<()> {
        let channel = self.connection.create_channel().await.map_err(BusError::Channel)?;

        channel
            .exchange_declare(
                DEAD_LETTER_EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BusError::Channel)?;

        for exchange in TOPIC_EXCHANGES {
            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Topic,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(BusError::Channel)?;
        }

        for spec in ALL_QUEUES {
            self.declare_queue_with_dlq(&channel, spec).await?;
        }

        Ok(())
    }

    async fn declare_queue_with_dlq(&self, channel: &lapin::Channel, spec: &QueueSpec) -> BusResult<()> {
        let dlq_name = format!("{}.dlq", spec.queue);
        channel
            .queue_declare(&dlq_name, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
            .await
            .map_err(BusError::Channel)?;
        channel
            .queue_bind(
                &dlq_name,
                DEAD_LETTER_EXCHANGE,
                spec.dlq_routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BusError::Channel)?;

        let mut args = FieldTable::default();
        args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString(DEAD_LETTER_EXCHANGE.into()));
        args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(spec.dlq_routing_key.into()),
        );
        channel
            .queue_declare(
                spec.queue,
                QueueDeclareOptions { durable: true, ..Default::default() },
                args,
            )
            .await
            .map_err(BusError::Channel)?;
        channel
            .queue_bind(
                spec.queue,
                spec.exchange,
                spec.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BusError::Channel)?;
        Ok(())
    }
}

#[async_trait]
impl Bus for AmqpBus {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: Vec<u8>) -> BusResult<()> {
        let channel = self.connection.create_channel().await.map_err(BusError::Channel)?;
        channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(BusError::Publish)?
            .await
            .map_err(BusError::Publish)?;
        Ok(())
    }

    async fn consume(&self, spec: QueueSpec, consumer_tag: &str) -> BusResult<BoxStream<'static, BusResult<Delivery>>> {
        let channel = self.connection.create_channel().await.map_err(BusError::Channel)?;
        channel
            .basic_qos(1, lapin::options::BasicQosOptions::default())
            .await
            .map_err(BusError::Channel)?;

        let consumer = channel
            .basic_consume(
                spec.queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BusError::Channel)?;

        let stream = consumer.filter_map(|delivery| async move {
            match delivery {
                Ok(delivery) => {
                    let routing_key = delivery.routing_key.to_string();
                    let payload = delivery.data.clone();
                    let acker = Acker::Amqp(delivery.acker.clone());
                    Some(Ok(Delivery::new(routing_key, payload, acker)))
                }
                Err(e) => {
                    warn!(error = %e, "consumer stream error");
                    Some(Err(BusError::Channel(e)))
                }
            }
        });

        Ok(stream.boxed())
    }
}
