//! `gardia` - Emergency reports relayed over a Meshtastic mesh
//!
//! This library provides the intake form server, the budget-constrained
//! message compaction and the link to a Meshtastic radio used by the
//! `gardia` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod compact;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod transmit;
pub mod web;

pub use compact::{compact, AlertTypes, EncodedMessage, IncidentReport, ShorteningStep};
pub use config::Config;
pub use error::{Error, Result};
pub use intake::FormSubmission;
pub use logging::init_logging;
pub use transmit::{DryRunTransmitter, LinkStatus, MeshTransmitter, Transmitter};
