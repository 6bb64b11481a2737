//! `ToRadio` encoding and stream framing.
//!
//! Messages are the prost types of [`crate::proto`]; proto3 leaves
//! zero-valued scalars off the wire.

use prost::Message;

use crate::error::{MeshError, Result};
use crate::proto::{to_radio::PayloadVariant, Data, MeshPacket, PortNum, ToRadio};

/// Node number meaning "every node on the channel".
pub const BROADCAST_ADDR: u32 = 0xFFFF_FFFF;

/// Largest `Data.payload` the firmware accepts (`DATA_PAYLOAD_LEN`).
pub const MAX_TEXT_PAYLOAD: usize = 233;

/// Largest protobuf accepted in one stream frame (`MAX_TO_FROM_RADIO_SIZE`).
pub const MAX_FRAME_PAYLOAD: usize = 512;

const START1: u8 = 0x94;
const START2: u8 = 0xC3;

const DEFAULT_HOP_LIMIT: u32 = 3;

/// Encode a `ToRadio` carrying a broadcast text message on `channel`.
///
/// The sender (`from`) and packet id are left unset; the firmware fills them
/// in for packets coming from a client.
///
/// # Errors
///
/// Returns [`MeshError::PayloadTooLarge`] if `text` exceeds
/// [`MAX_TEXT_PAYLOAD`] bytes.
pub fn encode_text_packet(text: &str, channel: u32, want_ack: bool) -> Result<Vec<u8>> {
    if text.len() > MAX_TEXT_PAYLOAD {
        return Err(MeshError::PayloadTooLarge {
            len: text.len(),
            max: MAX_TEXT_PAYLOAD,
        });
    }

    let packet = MeshPacket {
        to: BROADCAST_ADDR,
        channel,
        decoded: Some(Data {
            portnum: PortNum::TextMessageApp as i32,
            payload: text.as_bytes().to_vec(),
        }),
        hop_limit: DEFAULT_HOP_LIMIT,
        want_ack,
    };
    let to_radio = ToRadio {
        payload_variant: Some(PayloadVariant::Packet(packet)),
    };
    Ok(to_radio.encode_to_vec())
}

/// Encode a `ToRadio` asking the node to start its config download.
#[must_use]
pub fn encode_want_config(request_id: u32) -> Vec<u8> {
    ToRadio {
        payload_variant: Some(PayloadVariant::WantConfigId(request_id)),
    }
    .encode_to_vec()
}

/// Wrap an encoded protobuf in the serial stream header
/// (`0x94 0xC3 len_hi len_lo`).
///
/// # Errors
///
/// Returns [`MeshError::FrameTooLarge`] if `payload` exceeds
/// [`MAX_FRAME_PAYLOAD`] bytes.
#[allow(clippy::cast_possible_truncation)]
pub fn frame(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(MeshError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }
    let len = payload.len();
    let mut out = Vec::with_capacity(len + 4);
    out.extend_from_slice(&[START1, START2, (len >> 8) as u8, (len & 0xFF) as u8]);
    out.extend_from_slice(payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_packet_layout() {
        let encoded = encode_text_packet("hi", 1, false).unwrap();
        let expected = vec![
            0x0A, 0x11, // ToRadio.packet, 17 bytes
            0x15, 0xFF, 0xFF, 0xFF, 0xFF, // to = broadcast
            0x18, 0x01, // channel = 1
            0x22, 0x06, // decoded, 6 bytes
            0x08, 0x01, // portnum = TEXT_MESSAGE_APP
            0x12, 0x02, b'h', b'i', // payload
            0x48, 0x03, // hop_limit = 3
        ];
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_encode_text_packet_decodes() {
        let encoded = encode_text_packet("Incendie", 2, true).unwrap();
        let decoded = ToRadio::decode(encoded.as_slice()).unwrap();

        let Some(PayloadVariant::Packet(packet)) = decoded.payload_variant else {
            panic!("expected a packet");
        };
        assert_eq!(packet.to, BROADCAST_ADDR);
        assert_eq!(packet.channel, 2);
        assert_eq!(packet.hop_limit, 3);
        assert!(packet.want_ack);
        let data = packet.decoded.unwrap();
        assert_eq!(data.portnum(), PortNum::TextMessageApp);
        assert_eq!(data.payload, b"Incendie");
    }

    #[test]
    fn test_encode_text_packet_primary_channel_omits_field() {
        let encoded = encode_text_packet("hi", 0, false).unwrap();
        assert!(!encoded.windows(2).any(|w| w == [0x18, 0x00]));
        assert_eq!(encoded[1] as usize, encoded.len() - 2);
    }

    #[test]
    fn test_encode_text_packet_want_ack() {
        let encoded = encode_text_packet("hi", 1, true).unwrap();
        assert_eq!(&encoded[encoded.len() - 2..], &[0x50, 0x01]);
    }

    #[test]
    fn test_encode_text_packet_keeps_utf8() {
        let text = "Secours à Personnes";
        let encoded = encode_text_packet(text, 1, false).unwrap();
        assert!(encoded
            .windows(text.len())
            .any(|w| w == text.as_bytes()));
    }

    #[test]
    fn test_encode_text_packet_rejects_oversize() {
        let text = "x".repeat(MAX_TEXT_PAYLOAD + 1);
        let err = encode_text_packet(&text, 1, false).unwrap_err();
        assert!(matches!(err, MeshError::PayloadTooLarge { len: 234, .. }));
    }

    #[test]
    fn test_encode_want_config() {
        assert_eq!(encode_want_config(42), vec![0x18, 42]);
    }

    #[test]
    fn test_frame_header() {
        let framed = frame(&[1, 2, 3]).unwrap();
        assert_eq!(framed, vec![0x94, 0xC3, 0x00, 0x03, 1, 2, 3]);
    }

    #[test]
    fn test_frame_length_high_byte() {
        let payload = vec![0u8; 300];
        let framed = frame(&payload).unwrap();
        assert_eq!(&framed[..4], &[0x94, 0xC3, 0x01, 0x2C]);
        assert_eq!(framed.len(), 304);
    }

    #[test]
    fn test_frame_rejects_oversize() {
        let payload = vec![0u8; MAX_FRAME_PAYLOAD + 1];
        assert!(matches!(
            frame(&payload),
            Err(MeshError::FrameTooLarge { .. })
        ));
    }
}
