//! The ordered shortening policy.

use std::fmt;

use super::{abbreviate, floor_char_boundary, take_chars, Draft, ELLIPSIS};

/// One step of the shortening policy, with its parameters.
///
/// Character counts are Unicode scalar values; byte budgets are UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShorteningStep {
    /// Cut details longer than `longer_than` chars to `keep` chars + ellipsis.
    AbbreviateDetails {
        /// Details at or under this many chars are left alone.
        longer_than: usize,
        /// Chars kept before the ellipsis.
        keep: usize,
    },
    /// Cut the reporter name longer than `longer_than` chars to `keep` chars
    /// + ellipsis. Always cuts from the submitted name.
    AbbreviateName {
        /// Names at or under this many chars are left alone.
        longer_than: usize,
        /// Chars kept before the ellipsis.
        keep: usize,
    },
    /// Remove the details field.
    DropDetails,
    /// Cut the reporter name to `keep` chars + ellipsis.
    MinimalName {
        /// Chars kept before the ellipsis.
        keep: usize,
    },
    /// Shrink the address into whatever budget remains; when less than
    /// `min_budget` bytes remain, keep `fallback_keep` chars instead.
    FitAddress {
        /// Budgets at or under this many bytes use the fallback.
        min_budget: usize,
        /// Chars kept by the fallback.
        fallback_keep: usize,
    },
    /// Cut the encoded payload itself. The result may not be valid JSON.
    RawCut,
}

impl ShorteningStep {
    /// The policy, in the order it is applied.
    pub const POLICY: [ShorteningStep; 7] = [
        ShorteningStep::AbbreviateDetails {
            longer_than: 30,
            keep: 27,
        },
        ShorteningStep::AbbreviateName {
            longer_than: 20,
            keep: 17,
        },
        ShorteningStep::AbbreviateName {
            longer_than: 10,
            keep: 7,
        },
        ShorteningStep::DropDetails,
        ShorteningStep::MinimalName { keep: 5 },
        ShorteningStep::FitAddress {
            min_budget: 10,
            fallback_keep: 35,
        },
        ShorteningStep::RawCut,
    ];

    /// Apply this step to `draft`. Returns `false` when the step's guard did
    /// not match and nothing ran.
    pub(super) fn apply(self, draft: &mut Draft<'_>, limit: usize) -> bool {
        match self {
            Self::AbbreviateDetails { longer_than, keep } => {
                let Some(details) = draft.details.as_deref() else {
                    return false;
                };
                if details.chars().count() <= longer_than {
                    return false;
                }
                draft.details = Some(abbreviate(details, keep));
            }
            Self::AbbreviateName { longer_than, keep } => {
                let name = draft.report.reporter_name();
                if name.chars().count() <= longer_than {
                    return false;
                }
                draft.name = abbreviate(name, keep);
            }
            Self::DropDetails => {
                if draft.details.take().is_none() {
                    return false;
                }
            }
            Self::MinimalName { keep } => {
                let name = draft.report.reporter_name();
                draft.name = if name.chars().count() > keep {
                    abbreviate(name, keep)
                } else {
                    name.to_string()
                };
            }
            Self::FitAddress {
                min_budget,
                fallback_keep,
            } => {
                let address = draft.report.address();
                let bare = draft.encode_with_address("");
                // The bare encoding already carries the empty address's quotes; two
                // more bytes are held back on top of them.
                let budget = limit
                    .checked_sub(bare.len() + 2)
                    .filter(|&budget| budget > min_budget);
                draft.address = match budget {
                    Some(budget) => {
                        let kept = floor_char_boundary(address, budget - ELLIPSIS.len());
                        format!("{kept}{ELLIPSIS}")
                    }
                    None if address.chars().count() > fallback_keep => {
                        format!("{}{ELLIPSIS}", take_chars(address, fallback_keep))
                    }
                    None => address.to_string(),
                };
            }
            Self::RawCut => {
                let kept = floor_char_boundary(&draft.encoded, limit.saturating_sub(ELLIPSIS.len()));
                draft.encoded = format!("{kept}{ELLIPSIS}");
                return true;
            }
        }
        draft.reencode();
        true
    }
}

impl fmt::Display for ShorteningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbbreviateDetails { longer_than, keep } => {
                write!(f, "details over {longer_than} chars cut to {keep}")
            }
            Self::AbbreviateName { longer_than, keep } => {
                write!(f, "name over {longer_than} chars cut to {keep}")
            }
            Self::DropDetails => write!(f, "details dropped"),
            Self::MinimalName { keep } => write!(f, "name cut to {keep} chars"),
            Self::FitAddress { .. } => write!(f, "address fitted to remaining budget"),
            Self::RawCut => write!(f, "payload cut"),
        }
    }
}
