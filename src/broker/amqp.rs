//! AMQP 0-9-1 transport backed by `lapin`.

use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

use crate::broker::{BrokerConnection, BrokerDialer, BrokerError, BrokerTarget, OutboundMessage};

/// Persistent delivery mode.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Dials AMQP brokers.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmqpDialer;

#[async_trait]
impl BrokerDialer for AmqpDialer {
    async fn dial(&self, target: &BrokerTarget) -> Result<Arc<dyn BrokerConnection>, BrokerError> {
        let connection = Connection::connect(&target.url, ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::Dial(e.to_string()))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Dial(e.to_string()))?;

        channel
            .exchange_declare(
                &target.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Dial(e.to_string()))?;

        if target.publisher_confirms {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await
                .map_err(|e| BrokerError::Dial(e.to_string()))?;
        }

        Ok(Arc::new(AmqpConnection {
            connection,
            channel,
            exchange: target.exchange.clone(),
        }))
    }
}

/// A connection with one publishing channel.
pub struct AmqpConnection {
    connection: Connection,
    channel: Channel,
    exchange: String,
}

impl std::fmt::Debug for AmqpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpConnection")
            .field("exchange", &self.exchange)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    fn is_connected(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn publish(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::Disconnected);
        }

        let properties = BasicProperties::default()
            .with_content_type(message.content_type.into())
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT);

        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                &message.routing_key,
                BasicPublishOptions::default(),
                &message.payload,
                properties,
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        let confirmation = confirm
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        if confirmation.is_nack() {
            return Err(BrokerError::Nacked {
                exchange: self.exchange.clone(),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if !self.connection.status().connected() {
            return Ok(());
        }
        self.connection
            .close(200, "gateway shutdown")
            .await
            .map_err(|e| BrokerError::Close(e.to_string()))
    }
}
