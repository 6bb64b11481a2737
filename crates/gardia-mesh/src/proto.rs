//! The subset of `meshtastic/mesh.proto` used to broadcast text.
//!
//! Field numbers and types match the upstream definitions; fields this crate
//! never sets are left out, which prost encodes the same as unset.

/// Application port of a `Data` payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PortNum {
    /// Unset.
    UnknownApp = 0,
    /// Plain UTF-8 text message.
    TextMessageApp = 1,
}

/// Decoded packet contents.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Data {
    /// Application port.
    #[prost(enumeration = "PortNum", tag = "1")]
    pub portnum: i32,
    /// Application payload.
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

/// A packet sent over the mesh.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MeshPacket {
    /// Destination node number.
    #[prost(fixed32, tag = "2")]
    pub to: u32,
    /// Channel index.
    #[prost(uint32, tag = "3")]
    pub channel: u32,
    /// Cleartext contents.
    #[prost(message, optional, tag = "4")]
    pub decoded: Option<Data>,
    /// Remaining hops.
    #[prost(uint32, tag = "9")]
    pub hop_limit: u32,
    /// Request an acknowledgement.
    #[prost(bool, tag = "10")]
    pub want_ack: bool,
}

/// Message from a client to the node.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ToRadio {
    /// What the client sends.
    #[prost(oneof = "to_radio::PayloadVariant", tags = "1, 3")]
    pub payload_variant: Option<to_radio::PayloadVariant>,
}

/// Variants of [`ToRadio`].
pub mod to_radio {
    /// What a [`super::ToRadio`] carries.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum PayloadVariant {
        /// A packet to transmit.
        #[prost(message, tag = "1")]
        Packet(super::MeshPacket),
        /// Start the config download, tagged with this id.
        #[prost(uint32, tag = "3")]
        WantConfigId(u32),
    }
}
