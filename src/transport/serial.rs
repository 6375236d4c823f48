//! Serial/USB transport for coordinator sticks.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::error::{Error, Result};
use crate::protocol::{FrameDecoder, encode_frame};
use crate::transport::Transport;

/// Default serial device of USB coordinator sticks.
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default settle time after opening the port.
pub const DEFAULT_CONNECTION_DELAY: Duration = Duration::from_millis(300);

/// How long stale bytes are drained after opening.
const DRAIN_WINDOW: Duration = Duration::from_millis(500);

/// Configuration for serial transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyACM0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Delay after opening before draining and sending.
    pub connection_delay: Duration,
}

impl SerialConfig {
    /// Creates a configuration for `port` with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            connection_delay: DEFAULT_CONNECTION_DELAY,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the connection delay.
    #[must_use]
    pub const fn connection_delay(mut self, delay: Duration) -> Self {
        self.connection_delay = delay;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

/// Serial transport using split halves, so the reader can live in its own
/// task while commands are written.
pub struct SerialTransport {
    config: SerialConfig,
    writer: Option<WriteHalf<SerialStream>>,
    reader: Option<ReadHalf<SerialStream>>,
}

impl SerialTransport {
    /// Creates a new, unconnected transport.
    #[must_use]
    pub const fn new(config: SerialConfig) -> Self {
        Self {
            config,
            writer: None,
            reader: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Takes the reader half for use in a background task.
    ///
    /// Returns `None` before connecting or if already taken.
    pub fn take_reader(&mut self) -> Option<ReadHalf<SerialStream>> {
        self.reader.take()
    }

    /// Reads, decodes and forwards inbound frames until the port closes or
    /// the frame receiver is dropped.
    pub async fn run_read_loop(
        mut reader: ReadHalf<SerialStream>,
        frame_tx: mpsc::Sender<Bytes>,
    ) -> Result<()> {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => {
                    tracing::debug!("serial port closed");
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "serial port closed",
                    )));
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("serial read error: {}", e);
                    return Err(Error::Io(e));
                }
            };

            tracing::trace!("received {} bytes", n);
            decoder.feed(&buf[..n]);

            while let Some(frame) = decoder.decode() {
                tracing::trace!("decoded frame {}", hex::encode(&frame));
                if frame_tx.send(frame).await.is_err() {
                    tracing::debug!("frame receiver dropped");
                    return Ok(());
                }
            }
        }
    }

    async fn drain(stream: &mut SerialStream) -> usize {
        let mut buf = [0u8; 256];
        let mut total = 0usize;
        let deadline = tokio::time::Instant::now() + DRAIN_WINDOW;

        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(20), stream.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => total += n,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
        total
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.writer.is_some() {
                return Ok(());
            }

            tracing::info!(
                "opening {} at {} baud",
                self.config.port,
                self.config.baud_rate
            );

            let mut stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .open_native_async()
                .map_err(Error::Serial)?;

            tokio::time::sleep(self.config.connection_delay).await;

            let drained = Self::drain(&mut stream).await;
            if drained > 0 {
                tracing::debug!("drained {} stale bytes", drained);
            }

            let (reader, writer) = tokio::io::split(stream);
            self.reader = Some(reader);
            self.writer = Some(writer);

            tracing::info!("serial port {} open", self.config.port);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Some(mut writer) = self.writer.take() {
                tracing::info!("closing serial port {}", self.config.port);
                if let Err(e) = writer.shutdown().await {
                    tracing::warn!("serial shutdown failed: {}", e);
                }
            }
            self.reader = None;
            Ok(())
        })
    }

    fn send(&mut self, payload: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let writer = self.writer.as_mut().ok_or(Error::NotConnected)?;
            let frame = encode_frame(&payload)?;
            tracing::trace!("sending frame {}", hex::encode(&frame));

            writer.write_all(&frame).await?;
            writer.flush().await?;
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    fn spawn_reader(&mut self, frame_tx: mpsc::Sender<Bytes>) -> Option<JoinHandle<()>> {
        let reader = self.take_reader()?;
        Some(tokio::spawn(async move {
            if let Err(e) = Self::run_read_loop(reader, frame_tx).await {
                tracing::error!("read loop error: {}", e);
            }
        }))
    }
}

/// Lists available serial ports.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
