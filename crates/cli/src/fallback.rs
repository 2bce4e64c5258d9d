//! Degraded-mode document numbers, used only when the server cannot allocate one.
//!
//! These numbers are built from the clock alone and are not guaranteed unique; the
//! server rejects or reallocates them on collision at insert time.

use chrono::{DateTime, Datelike, Utc};
use utils::document_number::{DocumentKind, PrefixError, PrefixTable};

/// `{prefix}-{year}-{last six digits of the epoch milliseconds}`
pub fn fallback_number(prefixes: &PrefixTable, kind: DocumentKind, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{:06}",
        prefixes.prefix(kind),
        now.year(),
        now.timestamp_millis().rem_euclid(1_000_000)
    )
}

/// Prefix table with the same `WMS_PREFIX_*` overrides the server reads
pub fn prefixes_from_env() -> Result<PrefixTable, PrefixError> {
    PrefixTable::from_lookup(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_fallback_uses_last_six_millisecond_digits() {
        let now = Utc.timestamp_millis_opt(1_718_000_123_456).unwrap();
        let number = fallback_number(&PrefixTable::default(), DocumentKind::Delivery, now);
        assert_eq!(number, "DEL-2024-123456");
    }

    #[test]
    fn test_fallback_pads_small_remainders() {
        let now = Utc.timestamp_millis_opt(1_718_000_000_042).unwrap();
        let number = fallback_number(&PrefixTable::default(), DocumentKind::Receipt, now);
        assert_eq!(number, "REC-2024-000042");
    }

    #[test]
    fn test_prefix_overrides() {
        let prefixes = PrefixTable::from_lookup(|key| {
            (key == "WMS_PREFIX_TRANSFER").then(|| "MOV".to_string())
        })
        .unwrap();
        assert_eq!(prefixes.prefix(DocumentKind::Transfer), "MOV");
        assert_eq!(prefixes.prefix(DocumentKind::Adjustment), "ADJ");
    }
}
