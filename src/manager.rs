//! Driver lifecycle.
//!
//! [`Manager`] owns the transport and the background tasks that turn
//! inbound frames into responses and notifications. Its
//! [`CommandHandler`] is the [`Driver`](crate::driver::Driver) handed to the
//! watcher and the switch controller.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::commands::CommandHandler;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, NotificationReceiver};
use crate::protocol::{PacketType, parse_notification, parse_response};
use crate::transport::{SerialConfig, SerialTransport, Transport};
use crate::watcher::Watcher;

/// Capacity of the inbound frame queue and the response broadcast.
const CHANNEL_CAPACITY: usize = 256;

/// Connection to one coordinator.
pub struct Manager<T> {
    transport: Arc<Mutex<T>>,
    dispatcher: EventDispatcher,
    commands: CommandHandler<T>,

    read_task: Option<JoinHandle<()>>,
    process_task: Option<JoinHandle<()>>,
    watcher_task: Option<JoinHandle<()>>,
}

impl Manager<SerialTransport> {
    /// Creates a manager for a serial coordinator (not yet connected).
    #[must_use]
    pub fn serial(config: SerialConfig) -> Self {
        Self::new(SerialTransport::new(config))
    }
}

impl<T: Transport + 'static> Manager<T> {
    /// Creates a manager over any transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        let dispatcher = EventDispatcher::new(CHANNEL_CAPACITY);
        let transport = Arc::new(Mutex::new(transport));
        let commands = CommandHandler::new(Arc::clone(&transport), dispatcher.clone());

        Self {
            transport,
            dispatcher,
            commands,
            read_task: None,
            process_task: None,
            watcher_task: None,
        }
    }

    /// Sets how long commands wait for a reply.
    pub fn set_command_timeout(&mut self, timeout: Duration) {
        self.commands.set_timeout(timeout);
    }

    /// Hands out the notification stream. Only one consumer is allowed.
    ///
    /// Notifications queue until read, so taking the stream before
    /// [`add_driver`](Self::add_driver) misses nothing.
    pub fn take_notifications(&self) -> Result<NotificationReceiver> {
        self.dispatcher
            .take_notifications()
            .ok_or(Error::WatcherRegistered)
    }

    /// Runs `watcher` on its own task, fed by the notification stream.
    pub fn add_watcher<D: Driver + 'static>(&mut self, watcher: Watcher<D>) -> Result<()> {
        let notifications = self.take_notifications()?;
        self.watcher_task = Some(watcher.spawn(notifications));
        Ok(())
    }

    /// Stops the watcher task. Returns false if none was running.
    pub fn remove_watcher(&mut self) -> bool {
        match self.watcher_task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Opens the transport, starts the background tasks and starts the
    /// driver. Discovery runs asynchronously afterwards.
    pub async fn add_driver(&mut self) -> Result<()> {
        let (frame_tx, frame_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        {
            let mut transport = self.transport.lock().await;
            transport.connect().await?;
            self.read_task = transport.spawn_reader(frame_tx);
        }
        if self.read_task.is_none() {
            tracing::warn!("transport has no reader, no notifications will arrive");
        }

        let dispatcher = self.dispatcher.clone();
        self.process_task = Some(tokio::spawn(process_frames(frame_rx, dispatcher)));

        self.commands.app_start().await?;
        self.dispatcher.dispatch(Event::Connected);
        tracing::info!("driver added");
        Ok(())
    }

    /// Stops the driver, the background tasks and closes the transport.
    pub async fn remove_driver(&mut self) -> Result<()> {
        let connected = self.transport.lock().await.is_connected();
        if connected {
            if let Err(e) = self.commands.remove_driver().await {
                tracing::warn!("failed to stop driver: {e}");
            }
        }

        self.abort_tasks();
        self.transport.lock().await.disconnect().await?;
        self.dispatcher.dispatch(Event::Disconnected);
        tracing::info!("driver removed");
        Ok(())
    }

    /// Returns true if the transport is open.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Returns the command handler.
    #[must_use]
    pub fn commands(&self) -> CommandHandler<T> {
        self.commands.clone()
    }
}

impl<T> Manager<T> {
    fn abort_tasks(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(task) = self.process_task.take() {
            task.abort();
        }
    }
}

/// Routes decoded frames until the frame queue closes.
async fn process_frames(mut frame_rx: mpsc::Receiver<Bytes>, dispatcher: EventDispatcher) {
    while let Some(frame) = frame_rx.recv().await {
        process_frame(&frame, &dispatcher);
    }
}

/// Routes one frame payload to the response broadcast or the watcher queue.
fn process_frame(frame: &[u8], dispatcher: &EventDispatcher) {
    let Some((&packet_type, data)) = frame.split_first() else {
        return;
    };

    tracing::trace!(
        "processing packet type 0x{packet_type:02x}, {} bytes",
        data.len()
    );

    match PacketType::from_byte(packet_type) {
        Some(pkt) if pkt.is_notification() => match parse_notification(pkt, data) {
            Ok(notification) => dispatcher.notify(notification),
            Err(e) => tracing::warn!("dropping malformed {pkt:?}: {e}"),
        },
        Some(pkt) => {
            if let Some(event) = parse_response(pkt, data) {
                dispatcher.dispatch(event);
            }
        }
        None => tracing::debug!(
            "ignoring unknown packet type 0x{packet_type:02x}: {}",
            hex::encode(data)
        ),
    }
}

impl<T> Drop for Manager<T> {
    fn drop(&mut self) {
        self.abort_tasks();
        if let Some(task) = self.watcher_task.take() {
            task.abort();
        }
    }
}
