//! Document kinds and the `<PREFIX>-<PERIOD>-<SEQ>` number format shared by the
//! server allocator and the CLI fallback.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use ts_rs::TS;

/// Kind of inventory document that carries a sequential number
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentKind {
    Adjustment,
    Delivery,
    Transfer,
    Receipt,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown document kind: {0}")]
pub struct InvalidKind(pub String);

impl DocumentKind {
    /// Path segment used by the HTTP surface, e.g. `/api/deliveries`
    pub fn slug(self) -> &'static str {
        match self {
            DocumentKind::Adjustment => "adjustments",
            DocumentKind::Delivery => "deliveries",
            DocumentKind::Transfer => "transfers",
            DocumentKind::Receipt => "receipts",
        }
    }

    pub fn default_prefix(self) -> &'static str {
        match self {
            DocumentKind::Adjustment => "ADJ",
            DocumentKind::Delivery => "DEL",
            DocumentKind::Transfer => "TRF",
            DocumentKind::Receipt => "REC",
        }
    }

    /// JSON field that holds the number in create payloads
    pub fn number_field(self) -> &'static str {
        match self {
            DocumentKind::Adjustment => "adjustmentNumber",
            DocumentKind::Delivery => "deliveryNumber",
            DocumentKind::Transfer => "transferNumber",
            DocumentKind::Receipt => "receiptNumber",
        }
    }
}

/// Accepts both the singular name (`delivery`) and the route slug (`deliveries`).
impl FromStr for DocumentKind {
    type Err = InvalidKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DocumentKind::iter()
            .find(|kind| kind.to_string() == needle || kind.slug() == needle)
            .ok_or_else(|| InvalidKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("prefix for {0} must not be empty")]
    Empty(DocumentKind),
    #[error("prefix {prefix:?} for {kind} must be uppercase ASCII letters or digits")]
    Invalid { kind: DocumentKind, prefix: String },
    #[error("prefix {0:?} is assigned to more than one document kind")]
    Duplicate(String),
}

/// Fixed kind-to-prefix table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTable {
    adjustment: String,
    delivery: String,
    transfer: String,
    receipt: String,
}

impl Default for PrefixTable {
    fn default() -> Self {
        Self {
            adjustment: DocumentKind::Adjustment.default_prefix().to_string(),
            delivery: DocumentKind::Delivery.default_prefix().to_string(),
            transfer: DocumentKind::Transfer.default_prefix().to_string(),
            receipt: DocumentKind::Receipt.default_prefix().to_string(),
        }
    }
}

impl PrefixTable {
    pub fn prefix(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Adjustment => &self.adjustment,
            DocumentKind::Delivery => &self.delivery,
            DocumentKind::Transfer => &self.transfer,
            DocumentKind::Receipt => &self.receipt,
        }
    }

    /// Replace the prefix of one kind, keeping the table valid
    pub fn with_prefix(mut self, kind: DocumentKind, prefix: &str) -> Result<Self, PrefixError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(PrefixError::Empty(kind));
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(PrefixError::Invalid {
                kind,
                prefix: prefix.to_string(),
            });
        }
        if DocumentKind::iter().any(|other| other != kind && self.prefix(other) == prefix) {
            return Err(PrefixError::Duplicate(prefix.to_string()));
        }

        let slot = match kind {
            DocumentKind::Adjustment => &mut self.adjustment,
            DocumentKind::Delivery => &mut self.delivery,
            DocumentKind::Transfer => &mut self.transfer,
            DocumentKind::Receipt => &mut self.receipt,
        };
        *slot = prefix.to_string();
        Ok(self)
    }

    /// Defaults overridden by `WMS_PREFIX_<KIND>` keys found through `lookup`.
    /// Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PrefixError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table = Self::default();
        for kind in DocumentKind::iter() {
            let key = format!("WMS_PREFIX_{}", kind.to_string().to_ascii_uppercase());
            if let Some(prefix) = lookup(&key).filter(|value| !value.trim().is_empty()) {
                table = table.with_prefix(kind, &prefix)?;
            }
        }
        Ok(table)
    }
}

/// Layout of a document number: separator and minimum sequence width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub separator: char,
    pub min_width: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            separator: '-',
            min_width: 3,
        }
    }
}

impl NumberFormat {
    /// Starts-with pattern selecting one prefix and period, e.g. `ADJ-2024-`
    pub fn pattern(&self, prefix: &str, period: i32) -> String {
        format!("{prefix}{sep}{period:04}{sep}", sep = self.separator)
    }

    /// Zero-padded to `min_width`, wider sequences are never truncated
    pub fn format(&self, prefix: &str, period: i32, sequence: u64) -> String {
        format!(
            "{}{:0width$}",
            self.pattern(prefix, period),
            sequence,
            width = self.min_width
        )
    }

    /// Sequence component of a number, or `None` when the number does not have
    /// exactly three parts or the last part is not a plain base-10 integer.
    pub fn parse_sequence(&self, number: &str) -> Option<u64> {
        let mut parts = number.split(self.separator);
        let (_prefix, _period, sequence) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        sequence.parse().ok()
    }

    /// Highest parsed sequence among `numbers` starting with `pattern`, 0 if none parse
    pub fn max_sequence<'a, I>(&self, numbers: I, pattern: &str) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        numbers
            .into_iter()
            .filter(|number| number.starts_with(pattern))
            .filter_map(|number| {
                let parsed = self.parse_sequence(number);
                if parsed.is_none() {
                    tracing::debug!(number, "skipping malformed document number");
                }
                parsed
            })
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PREFIX{sep}YYYY{sep}{}",
            "0".repeat(self.min_width),
            sep = self.separator
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name_and_slug() {
        assert_eq!("delivery".parse::<DocumentKind>(), Ok(DocumentKind::Delivery));
        assert_eq!("deliveries".parse::<DocumentKind>(), Ok(DocumentKind::Delivery));
        assert_eq!("Receipts".parse::<DocumentKind>(), Ok(DocumentKind::Receipt));
        assert_eq!(
            "invoices".parse::<DocumentKind>(),
            Err(InvalidKind("invoices".to_string()))
        );
    }

    #[test]
    fn test_default_prefixes() {
        let table = PrefixTable::default();
        assert_eq!(table.prefix(DocumentKind::Adjustment), "ADJ");
        assert_eq!(table.prefix(DocumentKind::Delivery), "DEL");
        assert_eq!(table.prefix(DocumentKind::Transfer), "TRF");
        assert_eq!(table.prefix(DocumentKind::Receipt), "REC");
    }

    #[test]
    fn test_prefix_override_validation() {
        let table = PrefixTable::default()
            .with_prefix(DocumentKind::Receipt, "GRN")
            .unwrap();
        assert_eq!(table.prefix(DocumentKind::Receipt), "GRN");

        assert_eq!(
            PrefixTable::default().with_prefix(DocumentKind::Receipt, " "),
            Err(PrefixError::Empty(DocumentKind::Receipt))
        );
        assert!(matches!(
            PrefixTable::default().with_prefix(DocumentKind::Receipt, "R-C"),
            Err(PrefixError::Invalid { .. })
        ));
        assert!(matches!(
            PrefixTable::default().with_prefix(DocumentKind::Receipt, "adj"),
            Err(PrefixError::Invalid { .. })
        ));
        assert_eq!(
            PrefixTable::default().with_prefix(DocumentKind::Receipt, "DEL"),
            Err(PrefixError::Duplicate("DEL".to_string()))
        );
    }

    #[test]
    fn test_format_pads_to_three_digits() {
        let format = NumberFormat::default();
        assert_eq!(format.format("ADJ", 2024, 1), "ADJ-2024-001");
        assert_eq!(format.format("ADJ", 2024, 42), "ADJ-2024-042");
        assert_eq!(format.format("ADJ", 2024, 1000), "ADJ-2024-1000");
    }

    #[test]
    fn test_parse_sequence() {
        let format = NumberFormat::default();
        assert_eq!(format.parse_sequence("TRF-2024-007"), Some(7));
        assert_eq!(format.parse_sequence("TRF-2024-1000"), Some(1000));
        assert_eq!(format.parse_sequence("TRF-2024-abc"), None);
        assert_eq!(format.parse_sequence("TRF-2024-+5"), None);
        assert_eq!(format.parse_sequence("TRF-2024-"), None);
        assert_eq!(format.parse_sequence("TRF-2024-001-A"), None);
        assert_eq!(format.parse_sequence("TRF2024001"), None);
    }

    #[test]
    fn test_max_sequence_ignores_other_patterns() {
        let format = NumberFormat::default();
        let numbers = [
            "DEL-2024-003",
            "DEL-2024-abc",
            "DEL-2023-999",
            "XDEL-2024-050",
            "DEL-2024-011",
        ];
        assert_eq!(format.max_sequence(numbers, "DEL-2024-"), 11);
        assert_eq!(format.max_sequence([], "DEL-2024-"), 0);
    }
}
