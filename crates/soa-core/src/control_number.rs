//! Sort key normalisation for Annex A control numbers.
//!
//! Control numbers are dotted ("5.1", "5.10", "8.34"), so plain string
//! ordering puts "5.10" before "5.2". [`sort_key`] zero-pads each segment so
//! that `ORDER BY`-style lexicographic comparison recovers document order.

use crate::control::ControlRecord;

/// Normalise a control number into a lexicographically-sortable string.
///
/// Input: "5", "5.2", "5.10", "8.34"
/// Output: "005.000", "005.002", "005.010", "008.034"
///
/// Each dot-separated segment contributes its leading ASCII digits, zero-padded
/// to 3 places. At least 2 segments are always emitted.
pub fn sort_key(s: &str) -> String {
    let s = s.trim();

    let mut segments: Vec<u32> = s
        .split('.')
        .map(|seg| {
            let digits: String = seg.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        })
        .collect();

    while segments.len() < 2 {
        segments.push(0);
    }

    segments
        .iter()
        .map(|n| format!("{n:03}"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Sort records into document order by control number. Stable for equal keys.
pub fn sort_controls(records: &mut [ControlRecord]) {
    records.sort_by_cached_key(|c| sort_key(&c.control_number));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Applicability, Drivers};

    fn assert_sorted_order(inputs: &[&str]) {
        let keys: Vec<String> = inputs.iter().map(|s| sort_key(s)).collect();
        for i in 1..keys.len() {
            assert!(
                keys[i - 1] < keys[i],
                "Expected {:?} ({}) < {:?} ({})",
                inputs[i - 1],
                keys[i - 1],
                inputs[i],
                keys[i],
            );
        }
    }

    #[test]
    fn annex_a_sequence() {
        assert_sorted_order(&["5.1", "5.2", "5.9", "5.10", "5.37", "6.1", "8.1", "8.34"]);
    }

    #[test]
    fn section_before_its_controls() {
        assert_sorted_order(&["5", "5.1", "6"]);
    }

    #[test]
    fn exact_values() {
        assert_eq!(sort_key("5"), "005.000");
        assert_eq!(sort_key("5.2"), "005.002");
        assert_eq!(sort_key("5.10"), "005.010");
        assert_eq!(sort_key("8.34"), "008.034");
    }

    #[test]
    fn empty_and_garbage() {
        assert_eq!(sort_key(""), "000.000");
        assert_eq!(sort_key("A.5"), "000.005");
    }

    #[test]
    fn whitespace_trimmed() {
        assert_eq!(sort_key("  5.10 "), sort_key("5.10"));
    }

    #[test]
    fn sort_controls_orders_by_number() {
        let mut records: Vec<ControlRecord> = ["5.10", "5.2", "5.1"]
            .iter()
            .map(|n| ControlRecord {
                control_number: n.to_string(),
                title: "t".into(),
                objective: "o".into(),
                drivers: Drivers::default(),
                is_required: false,
                is_applicable: Applicability::NotApplicable,
                date_last_assessed: String::new(),
                not_applicable_reason: String::new(),
            })
            .collect();
        sort_controls(&mut records);
        let numbers: Vec<_> = records.iter().map(|c| c.control_number.as_str()).collect();
        assert_eq!(numbers, vec!["5.1", "5.2", "5.10"]);
    }
}
