//! Serial-port handle to a Meshtastic node.

use std::fmt;
use std::io::{Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, info, trace};

use crate::error::{MeshError, Result};
use crate::framing::{encode_text_packet, encode_want_config, frame};

/// Baud rate used by Meshtastic firmware on its USB serial console.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

const WAKE_PREAMBLE_LEN: usize = 32;
const WAKE_DELAY: Duration = Duration::from_millis(100);
const PORT_TIMEOUT: Duration = Duration::from_millis(500);

/// An open serial link to a Meshtastic node.
///
/// The node streams `FromRadio` frames at us continuously; they are not
/// decoded, only drained before each write so the OS buffer never fills.
pub struct SerialRadio {
    device: String,
    port: Box<dyn SerialPort>,
}

impl fmt::Debug for SerialRadio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialRadio")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl SerialRadio {
    /// Open `device` at `baud_rate` (8N1), wake the node and request its
    /// configuration so it switches to the client API.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Open`] if the port cannot be opened, or
    /// [`MeshError::Io`] if the wake-up sequence cannot be written.
    pub fn open(device: &str, baud_rate: u32) -> Result<Self> {
        debug!("Opening serial device {} at {} baud", device, baud_rate);
        let port = serialport::new(device, baud_rate)
            .timeout(PORT_TIMEOUT)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .open()
            .map_err(|source| MeshError::Open {
                device: device.to_string(),
                source,
            })?;

        let mut radio = Self {
            device: device.to_string(),
            port,
        };
        radio.wake()?;
        info!("Meshtastic link established on {}", device);
        Ok(radio)
    }

    /// Path of the underlying serial device.
    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    fn wake(&mut self) -> Result<()> {
        if let Err(err) = self.port.write_data_terminal_ready(true) {
            debug!("DTR not set on {}: {}", self.device, err);
        }
        self.port.write_all(&[0xC3; WAKE_PREAMBLE_LEN])?;
        self.port.flush()?;
        std::thread::sleep(WAKE_DELAY);
        if let Err(err) = self.port.clear(ClearBuffer::Input) {
            debug!("Input buffer of {} not cleared: {}", self.device, err);
        }

        let request_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(1, |d| d.subsec_nanos() | 1);
        self.write_frame(&encode_want_config(request_id))
    }

    /// Broadcast `text` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is too large for one mesh packet or the
    /// device write fails.
    pub fn send_text(&mut self, text: &str, channel: u32) -> Result<()> {
        let to_radio = encode_text_packet(text, channel, false)?;
        self.drain_input();
        self.write_frame(&to_radio)?;
        debug!(
            "Sent text packet on channel {} ({} bytes payload)",
            channel,
            text.len()
        );
        Ok(())
    }

    fn write_frame(&mut self, to_radio: &[u8]) -> Result<()> {
        let framed = frame(to_radio)?;
        self.port.write_all(&framed)?;
        self.port.flush()?;
        trace!("Wrote {} byte frame to {}", framed.len(), self.device);
        Ok(())
    }

    fn drain_input(&mut self) {
        let mut buf = [0u8; 512];
        while let Ok(available) = self.port.bytes_to_read() {
            if available == 0 {
                break;
            }
            match self.port.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => trace!("Discarded {} bytes from {}", n, self.device),
            }
        }
    }

    /// Release the serial port.
    pub fn close(self) {
        info!("Meshtastic link on {} closed", self.device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = SerialRadio::open("/nonexistent/ttyUSB-gardia", DEFAULT_BAUD_RATE).unwrap_err();
        assert!(matches!(err, MeshError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/ttyUSB-gardia"));
    }

    #[test]
    fn test_default_baud_rate() {
        assert_eq!(DEFAULT_BAUD_RATE, 115_200);
    }
}
