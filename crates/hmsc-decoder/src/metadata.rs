use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use hmsc_types::{DecodedTx, Metadata, MetadataValidation, TxDetails};

use crate::extract::extract_amounts;

/// Substrings that, found anywhere in a string-valued metadata field,
/// suggest social-engineering pressure rather than a genuine property of
/// the transaction. Flagged as a warning, never a blocking mismatch: a
/// session can legitimately be urgent.
const URGENCY_WORDS: &[&str] = &[
    "urgent",
    "immediately",
    "asap",
    "hurry",
    "quickly",
    "now",
    "emergency",
];

/// Coordinator-supplied `metadata.type` values that should be treated as
/// synonyms of a `TxDetails::type_tag()`, since callers often describe a
/// transaction in domain terms rather than the wire family name.
static TYPE_ALIASES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("send", "Transfer"),
        ("payment", "Transfer"),
        ("payout", "Transfer"),
        ("mint", "TokenMint"),
        ("burn", "TokenBurn"),
        ("contract_call", "ContractExecute"),
        ("contractcall", "ContractExecute"),
        ("swap", "ContractExecute"),
    ])
});

/// Relative tolerance for amount comparisons: metadata is often a
/// human-entered or display-rounded figure, so an exact match is not
/// required.
const AMOUNT_TOLERANCE: f64 = 1e-4;

/// Cross-checks coordinator-supplied `metadata` against what the
/// transaction actually decoded to. Pure: the same `(decoded, metadata)`
/// pair always yields the same result.
pub fn validate_metadata(decoded: &DecodedTx, metadata: &Metadata) -> MetadataValidation {
    let mut warnings = Vec::new();
    let mut mismatches = BTreeMap::new();

    for (key, value) in metadata {
        if let Some(text) = value.as_str() {
            let lower = text.to_lowercase();
            if URGENCY_WORDS.iter().any(|w| lower.contains(w)) {
                warnings.push(format!("metadata.{key} contains urgency language: {text:?}"));
            }
        }
    }

    if let Some(declared_type) = metadata.get("type").and_then(|v| v.as_str()) {
        check_type(declared_type, decoded.details.type_tag(), &mut mismatches);
    }

    if let Some(declared_fn) = metadata.get("functionName").and_then(|v| v.as_str()) {
        check_function_name(declared_fn, decoded, &mut mismatches);
    }

    if let Some(declared_amount) = metadata.get("amount").and_then(|v| v.as_f64()) {
        check_amount(declared_amount, decoded, &mut mismatches);
    }

    if !metadata.is_empty() {
        warnings.push("metadata is unverified".to_string());
    }

    MetadataValidation {
        valid: mismatches.is_empty(),
        warnings,
        mismatches,
    }
}

fn check_type(declared: &str, actual: &str, mismatches: &mut BTreeMap<String, String>) {
    let normalized = declared.to_lowercase();
    let resolved = TYPE_ALIASES
        .get(normalized.as_str())
        .copied()
        .unwrap_or(declared);

    if !resolved.eq_ignore_ascii_case(actual) {
        mismatches.insert(
            "type".to_string(),
            format!("metadata declared {declared:?}, transaction decoded as {actual:?}"),
        );
    }
}

fn check_function_name(declared: &str, decoded: &DecodedTx, mismatches: &mut BTreeMap<String, String>) {
    match decoded.details.function_name() {
        Some(actual) if actual.eq_ignore_ascii_case(declared) => {}
        Some(actual) => {
            mismatches.insert(
                "functionName".to_string(),
                format!("metadata declared {declared:?}, call data resolved to {actual:?}"),
            );
        }
        None => {
            mismatches.insert(
                "functionName".to_string(),
                format!("metadata declared {declared:?}, but the call-data selector is unverified"),
            );
        }
    }
}

/// A declared amount matches if it is within tolerance of *any* amount
/// extracted from the transaction's details, regardless of family. A
/// family with no extractable amounts at all (or none close enough)
/// records a mismatch rather than silently passing.
fn check_amount(declared: f64, decoded: &DecodedTx, mismatches: &mut BTreeMap<String, String>) {
    let amounts = extract_amounts(&decoded.details);

    let matches_any = amounts.iter().any(|a| {
        let actual = a.value as f64;
        if actual == 0.0 {
            declared.abs() < 1e-9
        } else {
            ((declared - actual) / actual).abs() <= AMOUNT_TOLERANCE
        }
    });

    if !matches_any {
        mismatches.insert(
            "amount".to_string(),
            format!("metadata declared {declared}, no extracted amount matches"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmsc_types::{AccountRef, Amount};
    use serde_json::json;

    fn transfer_decoded() -> DecodedTx {
        DecodedTx {
            type_tag: "Transfer".into(),
            full_checksum: "a".repeat(64),
            short_checksum: "a".repeat(16),
            valid_start_secs: None,
            valid_duration_secs: None,
            details: TxDetails::Transfer {
                transfers: vec![Amount {
                    account: AccountRef("0.0.1001".into()),
                    value: 1000,
                }],
            },
        }
    }

    #[test]
    fn matching_metadata_is_valid() {
        let decoded = transfer_decoded();
        let metadata = Metadata::from([
            ("type".to_string(), json!("send")),
            ("amount".to_string(), json!(1000)),
        ]);

        let result = validate_metadata(&decoded, &metadata);
        assert!(result.valid);
        assert!(result.mismatches.is_empty());
    }

    #[test]
    fn amount_within_tolerance_is_valid() {
        let decoded = transfer_decoded();
        let metadata = Metadata::from([("amount".to_string(), json!(1000.05))]);

        let result = validate_metadata(&decoded, &metadata);
        assert!(result.valid);
    }

    #[test]
    fn amount_outside_tolerance_is_a_mismatch() {
        let decoded = transfer_decoded();
        let metadata = Metadata::from([("amount".to_string(), json!(2000))]);

        let result = validate_metadata(&decoded, &metadata);
        assert!(!result.valid);
        assert!(result.mismatches.contains_key("amount"));
    }

    #[test]
    fn amount_on_a_family_without_extracted_amounts_is_a_mismatch() {
        let decoded = DecodedTx {
            type_tag: "TopicCreate".into(),
            full_checksum: "a".repeat(64),
            short_checksum: "a".repeat(16),
            valid_start_secs: None,
            valid_duration_secs: None,
            details: TxDetails::TopicCreate {},
        };
        let metadata = Metadata::from([("amount".to_string(), json!(500))]);

        let result = validate_metadata(&decoded, &metadata);
        assert!(!result.valid);
        assert!(result.mismatches.contains_key("amount"));
    }

    #[test]
    fn mismatched_type_is_flagged() {
        let decoded = transfer_decoded();
        let metadata = Metadata::from([("type".to_string(), json!("mint"))]);

        let result = validate_metadata(&decoded, &metadata);
        assert!(!result.valid);
        assert!(result.mismatches.contains_key("type"));
    }

    #[test]
    fn urgency_language_warns_but_stays_valid() {
        let decoded = transfer_decoded();
        let metadata = Metadata::from([(
            "note".to_string(),
            json!("please approve immediately, this is urgent"),
        )]);

        let result = validate_metadata(&decoded, &metadata);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().any(|w| w == "metadata is unverified"));
    }

    #[test]
    fn any_metadata_always_carries_the_unverified_warning() {
        let decoded = transfer_decoded();
        let metadata = Metadata::from([("amount".to_string(), json!(1000))]);

        let result = validate_metadata(&decoded, &metadata);
        assert_eq!(result.warnings, vec!["metadata is unverified".to_string()]);
    }
}
