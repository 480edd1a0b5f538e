//! Property-based tests for outcome classification.
//!
//! These tests verify that classification is total, exclusive and
//! independent of log-line order.

#![allow(clippy::disallowed_methods)]

use proptest::prelude::*;
use sdc_sampling::classify::{
    classify, ErrorKind, InjectionSite, ERROR_DETECTED_SIGNAL, SUCCESS_SIGNAL,
};
use sdc_sampling::SimError;

/// Strategy for generating identifier fields (no '|')
fn field() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.x]{0,12}".prop_map(|s| s.clone())
}

/// Strategy for generating run signals
fn signal() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(SUCCESS_SIGNAL.to_string()),
        Just(ERROR_DETECTED_SIGNAL.to_string()),
        Just("RunResult.Crash".to_string()),
        Just("RunResult.Timeout".to_string()),
    ]
}

/// Strategy for generating log lines, some carrying markers
fn log_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z ]{0,30}".prop_map(|s| s.clone()),
        1 => Just("SDC Not detected by checker".to_string()),
        1 => Just("Validation failed: mismatch".to_string()),
    ]
}

fn expected(signal: &str, log: &[String]) -> Option<ErrorKind> {
    if log.iter().any(|l| l.contains("SDC Not")) {
        Some(ErrorKind::SdcNotDetected)
    } else if log.iter().any(|l| l.contains("Validation failed")) {
        (signal == ERROR_DETECTED_SIGNAL).then_some(ErrorKind::SdcDetected)
    } else if signal != SUCCESS_SIGNAL {
        Some(ErrorKind::FailStop)
    } else {
        Some(ErrorKind::Masked)
    }
}

proptest! {
    /// Property: Classification follows the priority order, failing only on
    /// a validation failure with the wrong signal
    #[test]
    fn classification_follows_priority(
        signal in signal(),
        log in prop::collection::vec(log_line(), 0..8),
    ) {
        match (classify("p|f|pc|hw|u|i", &signal, &log), expected(&signal, &log)) {
            (Ok(kind), Some(want)) => prop_assert_eq!(kind, want),
            (Err(SimError::InconsistentOutcome { .. }), None) => {}
            (got, want) => prop_assert!(false, "got {:?}, expected {:?}", got, want),
        }
    }

    /// Property: Reordering log lines does not change the classification
    #[test]
    fn classification_is_order_independent(
        signal in signal(),
        log in prop::collection::vec(log_line(), 0..8),
    ) {
        let mut reversed = log.clone();
        reversed.reverse();
        let a = classify("x", &signal, &log).ok();
        let b = classify("x", &signal, &reversed).ok();
        prop_assert_eq!(a, b);
    }

    /// Property: Six-field identifiers parse as the compact layout
    #[test]
    fn six_fields_parse_compact(fields in prop::collection::vec(field(), 6)) {
        let site = InjectionSite::parse(&fields.join("|")).unwrap();
        let is_compact = matches!(site, InjectionSite::Compact { .. });
        prop_assert!(is_compact);
        prop_assert_eq!(site.function(), fields[1].as_str());
    }

    /// Property: Seven-field identifiers parse as the extended layout with
    /// the function in the same position
    #[test]
    fn seven_fields_parse_extended(fields in prop::collection::vec(field(), 7)) {
        let site = InjectionSite::parse(&fields.join("|")).unwrap();
        let instruction = match &site {
            InjectionSite::Extended { instruction, .. } => Some(instruction.as_str()),
            InjectionSite::Compact { .. } => None,
        };
        prop_assert_eq!(instruction, Some(fields[6].as_str()));
        prop_assert_eq!(site.function(), fields[1].as_str());
    }

    /// Property: Every other field count is rejected
    #[test]
    fn other_field_counts_rejected(
        fields in prop::collection::vec(field(), 1..12)
            .prop_filter("accepted layouts", |f| f.len() != 6 && f.len() != 7),
    ) {
        let is_malformed = matches!(
            InjectionSite::parse(&fields.join("|")),
            Err(SimError::MalformedIdentifier { .. })
        );
        prop_assert!(is_malformed);
    }
}
