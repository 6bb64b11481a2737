//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::compact::IncidentReport;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Log payloads instead of opening the serial device
    #[arg(long)]
    pub dry_run: bool,
}

/// Compact command arguments: one report, as the form would submit it.
#[derive(Debug, Args)]
pub struct CompactCommand {
    /// Reporter name
    #[arg(long)]
    pub name: String,

    /// Callback phone number
    #[arg(long)]
    pub phone: String,

    /// Incident address
    #[arg(long)]
    pub address: String,

    /// Incident type label (see `alert_types` in the configuration)
    #[arg(short = 't', long = "type", value_name = "LABEL")]
    pub incident_type: String,

    /// Free-text details
    #[arg(short, long, default_value = "")]
    pub details: String,

    /// Payload limit in bytes (defaults to `meshtastic.max_message_length`)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl CompactCommand {
    /// The report described by the arguments.
    #[must_use]
    pub fn report(&self) -> IncidentReport {
        IncidentReport::new(
            self.name.trim(),
            self.phone.trim(),
            self.address.trim(),
            self.incident_type.trim(),
        )
        .with_details(self.details.trim())
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_report_trims() {
        let cmd = CompactCommand {
            name: " Jean Dupont ".to_string(),
            phone: "0601020304".to_string(),
            address: "Paris ".to_string(),
            incident_type: "Incendie".to_string(),
            details: String::new(),
            limit: None,
            json: false,
        };
        let report = cmd.report();
        assert_eq!(report.reporter_name(), "Jean Dupont");
        assert_eq!(report.address(), "Paris");
        assert_eq!(report.details(), "");
    }
}
