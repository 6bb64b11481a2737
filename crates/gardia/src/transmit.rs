//! Outbound transmission of compacted payloads.
//!
//! The web layer only sees the [`Transmitter`] trait. [`MeshTransmitter`]
//! drives a Meshtastic node over its serial port; [`DryRunTransmitter`] logs
//! and records payloads instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gardia_mesh::{MeshError, SerialRadio};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::MeshtasticConfig;
use crate::error::{Error, Result};

/// State of the outbound link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// The device is open.
    Connected,
    /// No device is open; the next transmission will try to open it.
    Disconnected,
    /// Payloads are logged, not sent.
    DryRun,
}

impl LinkStatus {
    /// Whether a transmission can go out right now.
    #[must_use]
    pub fn is_up(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// `OK` or `ERROR`, as reported by the health endpoint.
    #[must_use]
    pub fn health_label(&self) -> &'static str {
        if self.is_up() {
            "OK"
        } else {
            "ERROR"
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::DryRun => write!(f, "dry-run"),
        }
    }
}

/// Where and within what budget a payload goes. Taken from the live
/// configuration on every send, so an admin save applies to the next alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTarget {
    /// Channel index the payload is broadcast on.
    pub channel_index: u32,
    /// Largest payload accepted, in bytes.
    pub limit: usize,
}

impl SendTarget {
    /// Target described by the `meshtastic` config section.
    #[must_use]
    pub fn from_config(config: &MeshtasticConfig) -> Self {
        Self {
            channel_index: config.channel_index,
            limit: config.max_message_length,
        }
    }
}

/// Sends one text payload to the responders' channel.
///
/// Implementations serialize concurrent calls; two submissions never
/// interleave on the link.
#[async_trait::async_trait]
pub trait Transmitter: Send + Sync + fmt::Debug {
    /// Send `text` on `target`'s channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds `target.limit` or the link
    /// fails.
    async fn transmit(&self, text: &str, target: SendTarget) -> Result<()>;

    /// Current state of the link.
    async fn status(&self) -> LinkStatus;

    /// Release the link. Later transmissions may reopen it.
    async fn close(&self);
}

fn check_length(text: &str, limit: usize) -> Result<()> {
    if text.len() > limit {
        return Err(Error::MessageTooLong {
            len: text.len(),
            limit,
        });
    }
    Ok(())
}

/// Transmitter backed by a Meshtastic node on a serial port.
///
/// Device and baud rate are fixed at creation; channel and budget come with
/// each [`SendTarget`].
#[derive(Debug)]
pub struct MeshTransmitter {
    settings: Arc<LinkSettings>,
    radio: Mutex<Option<SerialRadio>>,
}

#[derive(Debug)]
struct LinkSettings {
    device: String,
    baud_rate: u32,
}

impl MeshTransmitter {
    /// Create a transmitter for the configured device. The port is opened by
    /// [`MeshTransmitter::connect`] or lazily on the first transmission.
    #[must_use]
    pub fn new(config: &MeshtasticConfig) -> Self {
        Self {
            settings: Arc::new(LinkSettings {
                device: config.device.clone(),
                baud_rate: config.baud_rate,
            }),
            radio: Mutex::new(None),
        }
    }

    /// Open the device now.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened.
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.radio.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let settings = Arc::clone(&self.settings);
        let radio = tokio::task::spawn_blocking(move || {
            SerialRadio::open(&settings.device, settings.baud_rate)
        })
        .await
        .map_err(|e| Error::internal(format!("serial open task failed: {e}")))??;
        *slot = Some(radio);
        Ok(())
    }
}

/// Send on an open radio, opening it first when needed. A failure on a link
/// that was already open is retried once on a fresh connection.
fn send_blocking(
    radio: Option<SerialRadio>,
    settings: &LinkSettings,
    text: &str,
    channel_index: u32,
) -> (Option<SerialRadio>, std::result::Result<(), MeshError>) {
    let reused = radio.is_some();
    let mut radio = match radio {
        Some(radio) => radio,
        None => match SerialRadio::open(&settings.device, settings.baud_rate) {
            Ok(radio) => radio,
            Err(err) => return (None, Err(err)),
        },
    };

    match radio.send_text(text, channel_index) {
        Ok(()) => (Some(radio), Ok(())),
        Err(err @ MeshError::PayloadTooLarge { .. }) => (Some(radio), Err(err)),
        Err(err) if reused => {
            warn!("Send on {} failed ({}), reconnecting", radio.device(), err);
            radio.close();
            send_blocking(None, settings, text, channel_index)
        }
        Err(err) => {
            radio.close();
            (None, Err(err))
        }
    }
}

#[async_trait::async_trait]
impl Transmitter for MeshTransmitter {
    async fn transmit(&self, text: &str, target: SendTarget) -> Result<()> {
        check_length(text, target.limit)?;

        let mut slot = self.radio.lock().await;
        let radio = slot.take();
        let settings = Arc::clone(&self.settings);
        let payload = text.to_string();

        let (radio, result) =
            tokio::task::spawn_blocking(move || {
                send_blocking(radio, &settings, &payload, target.channel_index)
            })
            .await
            .map_err(|e| Error::internal(format!("serial send task failed: {e}")))?;
        *slot = radio;

        match result {
            Ok(()) => {
                info!(
                    "Payload sent on channel {} ({} bytes)",
                    target.channel_index,
                    text.len()
                );
                Ok(())
            }
            Err(err) => {
                error!("Meshtastic send failed: {}", err);
                Err(err.into())
            }
        }
    }

    async fn status(&self) -> LinkStatus {
        if self.radio.lock().await.is_some() {
            LinkStatus::Connected
        } else {
            LinkStatus::Disconnected
        }
    }

    async fn close(&self) {
        if let Some(radio) = self.radio.lock().await.take() {
            radio.close();
        }
    }
}

/// Transmitter that logs payloads instead of sending them.
#[derive(Debug, Default)]
pub struct DryRunTransmitter {
    fail: AtomicBool,
    sent: Mutex<Vec<(u32, String)>>,
}

impl DryRunTransmitter {
    /// Create a dry-run transmitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following transmission fail, as a dead link would.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Payloads accepted so far, oldest first.
    pub async fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Channel of each accepted payload, oldest first.
    pub async fn channels(&self) -> Vec<u32> {
        self.sent.lock().await.iter().map(|(channel, _)| *channel).collect()
    }
}

#[async_trait::async_trait]
impl Transmitter for DryRunTransmitter {
    async fn transmit(&self, text: &str, target: SendTarget) -> Result<()> {
        check_length(text, target.limit)?;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::transmit("dry-run link marked as failing"));
        }
        info!(
            "[dry-run] would send {} bytes on channel {}: {}",
            text.len(),
            target.channel_index,
            text
        );
        self.sent
            .lock()
            .await
            .push((target.channel_index, text.to_string()));
        Ok(())
    }

    async fn status(&self) -> LinkStatus {
        if self.fail.load(Ordering::SeqCst) {
            LinkStatus::Disconnected
        } else {
            LinkStatus::DryRun
        }
    }

    async fn close(&self) {
        debug!("[dry-run] link closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: SendTarget = SendTarget {
        channel_index: 1,
        limit: 200,
    };

    fn missing_device() -> MeshtasticConfig {
        MeshtasticConfig {
            device: "/nonexistent/ttyUSB-gardia".to_string(),
            ..MeshtasticConfig::default()
        }
    }

    #[test]
    fn test_link_status_labels() {
        assert_eq!(LinkStatus::Connected.health_label(), "OK");
        assert_eq!(LinkStatus::DryRun.health_label(), "OK");
        assert_eq!(LinkStatus::Disconnected.health_label(), "ERROR");
        assert_eq!(LinkStatus::DryRun.to_string(), "dry-run");
    }

    #[tokio::test]
    async fn test_dry_run_records_payloads() {
        let tx = DryRunTransmitter::new();
        tx.transmit("first", TARGET).await.unwrap();
        tx.transmit("second", TARGET).await.unwrap();

        assert_eq!(tx.sent().await, vec!["first", "second"]);
        assert_eq!(tx.channels().await, vec![1, 1]);
        assert_eq!(tx.status().await, LinkStatus::DryRun);
    }

    #[tokio::test]
    async fn test_dry_run_rejects_oversize() {
        let tx = DryRunTransmitter::new();
        let target = SendTarget {
            limit: 10,
            ..TARGET
        };
        let err = tx.transmit("this is too long", target).await.unwrap_err();

        assert!(matches!(err, Error::MessageTooLong { len: 16, limit: 10 }));
        assert!(tx.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_failing() {
        let tx = DryRunTransmitter::new();
        tx.set_failing(true);

        assert!(tx.transmit("hello", TARGET).await.is_err());
        assert_eq!(tx.status().await, LinkStatus::Disconnected);

        tx.set_failing(false);
        assert!(tx.transmit("hello", TARGET).await.is_ok());
    }

    #[tokio::test]
    async fn test_mesh_rejects_oversize_before_opening() {
        let mut config = missing_device();
        config.max_message_length = 5;
        let tx = MeshTransmitter::new(&config);

        let err = tx
            .transmit("too long", SendTarget::from_config(&config))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageTooLong { .. }));
    }

    #[tokio::test]
    async fn test_mesh_missing_device() {
        let tx = MeshTransmitter::new(&missing_device());

        assert_eq!(tx.status().await, LinkStatus::Disconnected);
        assert!(tx.connect().await.is_err());

        let err = tx.transmit("hello", TARGET).await.unwrap_err();
        assert!(matches!(err, Error::Mesh(MeshError::Open { .. })));
        assert_eq!(tx.status().await, LinkStatus::Disconnected);

        tx.close().await;
    }

    #[tokio::test]
    async fn test_target_follows_each_call() {
        let tx = DryRunTransmitter::new();
        let wide = SendTarget {
            channel_index: 4,
            limit: 230,
        };
        let payload = "x".repeat(220);

        assert!(tx.transmit(&payload, TARGET).await.is_err());
        tx.transmit(&payload, wide).await.unwrap();

        assert_eq!(tx.channels().await, vec![4]);
    }

    #[test]
    fn test_target_from_config() {
        let config = MeshtasticConfig {
            channel_index: 3,
            max_message_length: 150,
            ..MeshtasticConfig::default()
        };
        assert_eq!(
            SendTarget::from_config(&config),
            SendTarget {
                channel_index: 3,
                limit: 150
            }
        );
    }
}
