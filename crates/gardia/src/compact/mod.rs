//! Budget-constrained message compaction.
//!
//! A report is serialized to compact JSON with stable short keys
//! (`type`, `nom`, `tel`, `adresse`, `details`). When the result exceeds the
//! radio's byte budget, the steps of [`ShorteningStep::POLICY`] run in order,
//! each re-measuring the payload, until it fits. The address is the last
//! field to be touched.
//!
//! ```
//! use gardia::compact::{compact, AlertTypes, IncidentReport};
//!
//! let report = IncidentReport::new("Jean Dupont", "0601020304", "12 rue de la Paix", "Incendie");
//! let message = compact(&report, &AlertTypes::default(), 200);
//! assert!(!message.truncated);
//! assert!(message.payload.starts_with(r#"{"type":1,"nom":"Jean Dupont""#));
//! ```

mod report;
mod step;

use serde::Serialize;
use tracing::debug;

pub use report::{AlertTypes, IncidentReport, DEFAULT_ALERT_CODE, DEFAULT_ALERT_LABEL};
pub use step::ShorteningStep;

/// Marker appended to every shortened value.
pub const ELLIPSIS: &str = "...";

/// Smallest budget for which the payload is expected to stay well-formed.
pub const MIN_PRACTICAL_LIMIT: usize = 40;

/// A compacted report, ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    /// The payload to transmit.
    pub payload: String,
    /// Whether any shortening step ran.
    pub truncated: bool,
    /// The steps that ran, in order.
    pub steps: Vec<ShorteningStep>,
}

impl EncodedMessage {
    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Whether the raw payload cut ran, meaning the payload may not parse.
    #[must_use]
    pub fn was_cut(&self) -> bool {
        self.steps.contains(&ShorteningStep::RawCut)
    }
}

#[derive(Serialize)]
struct WirePayload<'a> {
    #[serde(rename = "type")]
    type_code: u32,
    nom: &'a str,
    tel: &'a str,
    adresse: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

/// Working copy of the fields being shortened, plus their current encoding.
#[derive(Debug)]
struct Draft<'r> {
    report: &'r IncidentReport,
    type_code: u32,
    name: String,
    address: String,
    details: Option<String>,
    encoded: String,
}

impl<'r> Draft<'r> {
    fn new(report: &'r IncidentReport, type_code: u32) -> Self {
        let details = Some(report.details())
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let mut draft = Self {
            report,
            type_code,
            name: report.reporter_name().to_string(),
            address: report.address().to_string(),
            details,
            encoded: String::new(),
        };
        draft.reencode();
        draft
    }

    fn encode_with_address(&self, address: &str) -> String {
        let wire = WirePayload {
            type_code: self.type_code,
            nom: &self.name,
            tel: self.report.phone(),
            adresse: address,
            details: self.details.as_deref(),
        };
        serde_json::to_string(&wire).unwrap_or_default()
    }

    fn reencode(&mut self) {
        self.encoded = self.encode_with_address(&self.address);
    }
}

/// Compact `report` into a payload of at most `limit` bytes.
///
/// Never fails. Below [`MIN_PRACTICAL_LIMIT`] the final raw cut may leave a
/// payload that no longer parses as JSON.
#[must_use]
pub fn compact(report: &IncidentReport, alert_types: &AlertTypes, limit: usize) -> EncodedMessage {
    let mut draft = Draft::new(report, alert_types.code_for(report.incident_type()));
    let mut steps = Vec::new();

    for step in ShorteningStep::POLICY {
        if draft.encoded.len() <= limit {
            break;
        }
        if step.apply(&mut draft, limit) {
            debug!(step = %step, len = draft.encoded.len(), limit, "Shortening step applied");
            steps.push(step);
        }
    }

    EncodedMessage {
        truncated: !steps.is_empty(),
        payload: draft.encoded,
        steps,
    }
}

/// The first `n` chars of `text`.
pub(crate) fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The longest prefix of `text` that is at most `max_bytes` long and ends on
/// a char boundary.
pub(crate) fn floor_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

/// The first `keep` chars of `text` followed by [`ELLIPSIS`].
pub(crate) fn abbreviate(text: &str, keep: usize) -> String {
    format!("{}{ELLIPSIS}", take_chars(text, keep))
}
