//! Incident reports and the alert-type code table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label whose code is used for incident types missing from the table.
pub const DEFAULT_ALERT_LABEL: &str = "Autre";

/// Code used when the table has no [`DEFAULT_ALERT_LABEL`] entry either.
pub const DEFAULT_ALERT_CODE: u32 = 3;

/// A validated emergency report, ready to be compacted.
///
/// Required fields are checked by the intake layer before construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentReport {
    reporter_name: String,
    phone: String,
    address: String,
    incident_type: String,
    details: String,
}

impl IncidentReport {
    /// Create a report without details.
    #[must_use]
    pub fn new(
        reporter_name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
        incident_type: impl Into<String>,
    ) -> Self {
        Self {
            reporter_name: reporter_name.into(),
            phone: phone.into(),
            address: address.into(),
            incident_type: incident_type.into(),
            details: String::new(),
        }
    }

    /// Attach free-form details to the report.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Name of the person reporting.
    #[must_use]
    pub fn reporter_name(&self) -> &str {
        &self.reporter_name
    }

    /// Callback phone number, sent verbatim.
    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Incident address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Incident type label as chosen on the form.
    #[must_use]
    pub fn incident_type(&self) -> &str {
        &self.incident_type
    }

    /// Details, trimmed. Empty when none were given.
    #[must_use]
    pub fn details(&self) -> &str {
        self.details.trim()
    }
}

/// Mapping from incident-type label to the numeric code sent on air.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertTypes(BTreeMap<String, u32>);

impl Default for AlertTypes {
    fn default() -> Self {
        Self::from_pairs([
            ("Incendie", 1),
            ("Secours à Personnes", 2),
            (DEFAULT_ALERT_LABEL, DEFAULT_ALERT_CODE),
        ])
    }
}

impl AlertTypes {
    /// Build a table from `(label, code)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Code for `label`. Unknown labels fall back to the default label's
    /// code, then to [`DEFAULT_ALERT_CODE`].
    #[must_use]
    pub fn code_for(&self, label: &str) -> u32 {
        self.0
            .get(label)
            .or_else(|| self.0.get(DEFAULT_ALERT_LABEL))
            .copied()
            .unwrap_or(DEFAULT_ALERT_CODE)
    }

    /// Labels ordered by code, for rendering the form's choices.
    #[must_use]
    pub fn labels_by_code(&self) -> Vec<(&str, u32)> {
        let mut labels: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        labels.sort_by_key(|&(label, code)| (code, label));
        labels
    }

    /// Number of configured labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
