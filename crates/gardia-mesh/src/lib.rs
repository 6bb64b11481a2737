//! Meshtastic serial link for gardia.
//!
//! This crate speaks just enough of the Meshtastic client API to broadcast a
//! text message on a channel: `ToRadio` protobuf messages (prost), the
//! `0x94 0xC3` stream framing, and a handle around the USB serial port.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod error;
pub mod framing;
pub mod proto;
pub mod serial;

pub use error::{MeshError, Result};
pub use framing::{
    encode_text_packet, encode_want_config, frame, BROADCAST_ADDR, MAX_FRAME_PAYLOAD,
    MAX_TEXT_PAYLOAD,
};
pub use serial::{SerialRadio, DEFAULT_BAUD_RATE};
