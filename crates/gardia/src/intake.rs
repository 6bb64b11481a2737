//! Form intake: turning raw form fields into a validated report.

use std::borrow::Cow;

use serde::Deserialize;
use tracing::{info, warn};

use crate::compact::{take_chars, IncidentReport, ELLIPSIS};
use crate::error::{Error, Result};

/// Chars kept by [`preview`] in log lines.
pub const PREVIEW_CHARS: usize = 50;

/// Double-encoded UTF-8 sequences (UTF-8 bytes read back as Latin-1 or
/// CP-1252) and the characters they stand for.
const MOJIBAKE: &[(&str, &str)] = &[
    ("Ã€", "À"),
    ("Ã‰", "É"),
    ("Ãˆ", "È"),
    ("Ã‡", "Ç"),
    ("Ã\u{a0}", "à"),
    ("Ã ", "à"),
    ("Ã¡", "á"),
    ("Ã¢", "â"),
    ("Ã£", "ã"),
    ("Ã¤", "ä"),
    ("Ã¥", "å"),
    ("Ã§", "ç"),
    ("Ã¨", "è"),
    ("Ã©", "é"),
    ("Ãª", "ê"),
    ("Ã«", "ë"),
    ("Ã¬", "ì"),
    ("Ã\u{ad}", "í"),
    ("Ã®", "î"),
    ("Ã¯", "ï"),
    ("Ã±", "ñ"),
    ("Ã²", "ò"),
    ("Ã³", "ó"),
    ("Ã´", "ô"),
    ("Ãµ", "õ"),
    ("Ã¶", "ö"),
    ("Ã¹", "ù"),
    ("Ãº", "ú"),
    ("Ã»", "û"),
    ("Ã¼", "ü"),
    ("Ã½", "ý"),
    ("Ã¿", "ÿ"),
];

/// Raw fields of the intake form, as posted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormSubmission {
    /// Reporter's full name.
    pub nom_prenom: String,
    /// Callback phone number.
    pub telephone: String,
    /// Incident address.
    pub adresse: String,
    /// Incident type label.
    pub type_sinistre: String,
    /// Optional free-form details.
    pub details: String,
}

impl FormSubmission {
    /// Trim and repair every field, then check the required ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first required field that
    /// is empty.
    pub fn into_report(self) -> Result<IncidentReport> {
        let nom_prenom = clean_field("nom_prenom", &self.nom_prenom);
        let telephone = clean_field("telephone", &self.telephone);
        let adresse = clean_field("adresse", &self.adresse);
        let type_sinistre = clean_field("type_sinistre", &self.type_sinistre);
        let details = clean_field("details", &self.details);

        for (field, value) in [
            ("nom_prenom", &nom_prenom),
            ("telephone", &telephone),
            ("adresse", &adresse),
            ("type_sinistre", &type_sinistre),
        ] {
            if value.is_empty() {
                warn!("Submission rejected: {} is empty", field);
                return Err(Error::MissingField { field });
            }
        }

        Ok(IncidentReport::new(nom_prenom, telephone, adresse, type_sinistre).with_details(details))
    }
}

fn clean_field(name: &str, raw: &str) -> String {
    let (text, repaired) = repair_mojibake(raw.trim());
    if repaired {
        info!("Encoding repaired in field {}", name);
    }
    text
}

/// Undo common UTF-8 double-encoding damage (`Ã©` for `é`). Returns the
/// repaired text and whether anything changed.
#[must_use]
pub fn repair_mojibake(text: &str) -> (String, bool) {
    if !text.contains('Ã') {
        return (text.to_string(), false);
    }
    let mut repaired = text.to_string();
    for (broken, fixed) in MOJIBAKE {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, fixed);
        }
    }
    let changed = repaired != text;
    (repaired, changed)
}

/// `text` cut to `max` chars with an ellipsis, for log lines.
#[must_use]
pub fn preview(text: &str, max: usize) -> Cow<'_, str> {
    let head = take_chars(text, max);
    if head.len() == text.len() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{head}{ELLIPSIS}"))
    }
}

/// Log a received report, in full or as a one-line summary.
pub fn log_report(report: &IncidentReport, log_all_data: bool, remote: &str) {
    if log_all_data {
        info!("New alert received");
        info!("  Name:    {}", report.reporter_name());
        info!("  Phone:   {}", report.phone());
        info!("  Address: {}", report.address());
        info!("  Type:    {}", report.incident_type());
        if !report.details().is_empty() {
            info!("  Details: {}", report.details());
        }
        info!("  Time:    {}", chrono::Local::now().format("%d/%m/%Y %H:%M:%S"));
        info!("  Source:  {}", remote);
    } else {
        info!(
            "New alert received - type: {} - address: {} - source: {}",
            report.incident_type(),
            preview(report.address(), PREVIEW_CHARS),
            remote
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> FormSubmission {
        FormSubmission {
            nom_prenom: "  Jean Dupont ".to_string(),
            telephone: "0601020304".to_string(),
            adresse: "12 rue de la Paix\n".to_string(),
            type_sinistre: "Incendie".to_string(),
            details: String::new(),
        }
    }

    #[test]
    fn test_into_report_trims() {
        let report = submission().into_report().unwrap();

        assert_eq!(report.reporter_name(), "Jean Dupont");
        assert_eq!(report.address(), "12 rue de la Paix");
        assert!(report.details().is_empty());
    }

    #[test]
    fn test_into_report_missing_field() {
        let mut form = submission();
        form.telephone = "   ".to_string();

        let err = form.into_report().unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "telephone" }));
    }

    #[test]
    fn test_into_report_details_optional() {
        let mut form = submission();
        form.details = " 2 blessés ".to_string();

        let report = form.into_report().unwrap();
        assert_eq!(report.details(), "2 blessés");
    }

    #[test]
    fn test_into_report_repairs_encoding() {
        let mut form = submission();
        form.type_sinistre = "Secours Ã  Personnes".to_string();
        form.adresse = "Allée des Ã©rables".to_string();

        let report = form.into_report().unwrap();
        assert_eq!(report.incident_type(), "Secours à Personnes");
        assert_eq!(report.address(), "Allée des érables");
    }

    #[test]
    fn test_repair_mojibake() {
        assert_eq!(repair_mojibake("crÃ¨me brÃ»lÃ©e"), ("crème brûlée".to_string(), true));
        assert_eq!(repair_mojibake("Ã‰cole"), ("École".to_string(), true));
    }

    #[test]
    fn test_repair_mojibake_clean_text() {
        assert_eq!(repair_mojibake("déjà vu"), ("déjà vu".to_string(), false));
    }

    #[test]
    fn test_form_deserialize_missing_keys() {
        let form: FormSubmission =
            serde_json::from_str(r#"{"nom_prenom": "A", "telephone": "1"}"#).unwrap();
        assert!(form.details.is_empty());
        assert!(form.adresse.is_empty());
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("court", 50), "court");
        assert_eq!(preview(&"é".repeat(60), 50), format!("{}...", "é".repeat(50)));
        assert!(matches!(preview("abc", 3), Cow::Borrowed(_)));
    }
}
