//! Command handlers for the coordinator bridge.
//!
//! This module implements the request/response side of the protocol and
//! exposes it as a [`Driver`].

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, EventFilter, wait_matching};
use crate::protocol::{CommandOpcode, PacketType, put_value_id};
use crate::transport::Transport;
use crate::types::{NetworkId, ValueId};

/// Default command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Command handler for coordinator operations.
///
/// Replies carry no request id, so only one request is in flight at a time.
pub struct CommandHandler<T> {
    transport: Arc<Mutex<T>>,
    dispatcher: EventDispatcher,
    in_flight: Arc<Mutex<()>>,
    timeout: Duration,
}

impl<T> Clone for CommandHandler<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            dispatcher: self.dispatcher.clone(),
            in_flight: Arc::clone(&self.in_flight),
            timeout: self.timeout,
        }
    }
}

impl<T: Transport> CommandHandler<T> {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(transport: Arc<Mutex<T>>, dispatcher: EventDispatcher) -> Self {
        Self {
            transport,
            dispatcher,
            in_flight: Arc::new(Mutex::new(())),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the command timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Returns the command timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends a raw command and waits for one of the expected responses.
    async fn send_and_wait(&self, data: Bytes, expected: &[PacketType]) -> Result<Event> {
        let _in_flight = self.in_flight.lock().await;

        // Subscribe before sending so a fast reply cannot slip past.
        let filter = EventFilter::packet_types(expected.to_vec());
        let subscription = self.dispatcher.subscribe();

        {
            let mut transport = self.transport.lock().await;
            transport.send(data).await?;
        }

        wait_matching(subscription, &filter, self.timeout)
            .await
            .ok_or_else(|| Error::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })
    }

    /// Sends a command and maps `Ok`/`Error` to an acceptance flag.
    async fn send_expect_ack(&self, data: Bytes, what: &str) -> Result<bool> {
        match self
            .send_and_wait(data, &[PacketType::Ok, PacketType::Error])
            .await?
        {
            Event::Ok => Ok(true),
            Event::Error { message } => {
                tracing::warn!("{what} rejected: {message}");
                Ok(false)
            }
            _ => Err(Error::Protocol {
                message: "unexpected response".into(),
            }),
        }
    }

    /// Sends a command without waiting for a response.
    async fn send_fire_and_forget(&self, data: Bytes) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport.send(data).await
    }

    /// Starts the driver on the bridge. Discovery notifications follow.
    pub async fn app_start(&self) -> Result<()> {
        let data = Bytes::from_static(&[CommandOpcode::AppStart as u8]);
        match self
            .send_and_wait(data, &[PacketType::Ok, PacketType::Error])
            .await?
        {
            Event::Error { message } => Err(Error::Protocol { message }),
            _ => Ok(()),
        }
    }

    /// Stops the driver on the bridge.
    pub async fn remove_driver(&self) -> Result<()> {
        let data = Bytes::from_static(&[CommandOpcode::RemoveDriver as u8]);
        self.send_fire_and_forget(data).await
    }

    /// Sets a boolean value.
    pub async fn set_bool(&self, value: &ValueId, state: bool) -> Result<bool> {
        let mut buf = BytesMut::with_capacity(2 + ValueId::WIRE_SIZE);
        buf.put_u8(CommandOpcode::SetValue as u8);
        put_value_id(&mut buf, value);
        buf.put_u8(u8::from(state));
        self.send_expect_ack(buf.freeze(), "set value").await
    }

    /// Reads a value as text.
    pub async fn get_value_string(&self, value: &ValueId) -> Result<String> {
        let mut buf = BytesMut::with_capacity(1 + ValueId::WIRE_SIZE);
        buf.put_u8(CommandOpcode::GetValueString as u8);
        put_value_id(&mut buf, value);

        match self
            .send_and_wait(buf.freeze(), &[PacketType::ValueString, PacketType::Error])
            .await?
        {
            Event::ValueString(text) => Ok(text),
            Event::Error { message } => Err(Error::Protocol { message }),
            _ => Err(Error::Protocol {
                message: "unexpected response".into(),
            }),
        }
    }

    /// Cancels the in-flight controller command of a network.
    pub async fn cancel(&self, network_id: NetworkId) -> Result<bool> {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(CommandOpcode::CancelControllerCommand as u8);
        buf.put_u32_le(network_id);
        self.send_expect_ack(buf.freeze(), "cancel controller command")
            .await
    }
}

impl<T: Transport + 'static> Driver for CommandHandler<T> {
    fn set_value(&self, value: ValueId, state: bool) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move { self.set_bool(&value, state).await })
    }

    fn value_as_string(&self, value: ValueId) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { self.get_value_string(&value).await })
    }

    fn cancel_controller_command(&self, network_id: NetworkId) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move { self.cancel(network_id).await })
    }
}
