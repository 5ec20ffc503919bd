//! Extraction of per-control verdicts from a free-text assessment completion.
//!
//! The model is asked to answer in a loose template:
//!
//! ```text
//! Control Objective: 5.6 - Contact with special interest groups
//! Is this control required?: No
//! Why is this not applicable?: Our organization does not ...
//! ```
//!
//! Nothing guarantees it does. Extraction is therefore best-effort and
//! fail-open: any control without a recognisable verdict is reported as
//! required, and the output always holds exactly one result per requested
//! control.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use soa_core::{AssessmentResult, ControlRef};
use tracing::{debug, warn};

/// Reason used when a control is marked not required but no justification could be found.
pub const PLACEHOLDER_REASON: &str =
    "This control is not applicable to our organization (specific reasoning not parsed)";

/// Splits on the `Control Objective:` marker plus an optional number/title prefix.
static SECTION_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)Control Objective:\s*(?:[0-9]+\.[0-9]+\s*-\s*|\[.*?\]\s*-\s*|Control\s+[0-9]+:\s*)?",
    )
    .expect("static regex must compile")
});

/// Line-leading control references, used when the marker is absent.
static CONTROL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)(?:^|\n)(?:Control\s+)?([0-9]+\.[0-9]+|\[.*?\])")
        .expect("static regex must compile")
});

static REQUIRED_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Is this control required\?:\s*(Yes|No)",
        r"(?i)Required\?:\s*(Yes|No)",
        r"(?i)Applicable\?:\s*(Yes|No)",
        r"(?i)Control required:\s*(Yes|No)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex must compile"))
    .collect()
});

// Capture runs to a blank line, a line starting with "Control", or the end.
static REASON_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)Why is this not applicable\?:\s*(.+?)(?:\n\n|\nControl|\z)",
        r"(?is)Not applicable because:\s*(.+?)(?:\n\n|\nControl|\z)",
        r"(?is)Reason:\s*(.+?)(?:\n\n|\nControl|\z)",
        r"(?is)Justification:\s*(.+?)(?:\n\n|\nControl|\z)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex must compile"))
    .collect()
});

/// Context-entry citations rewritten into the organisation's own voice, applied in order.
static CONTEXT_ENTRY_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Based on Context Entry [0-9]+",
        r"(?i)Context Entry [0-9]+ (?:shows|indicates|states)",
        r"(?i)According to Context Entry [0-9]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex must compile"))
    .collect()
});

const ORGANIZATION_VOICE: &str = "Our organization";

/// Produce exactly one verdict per control from a free-text completion.
///
/// Results parsed from the response come first, in response order; controls
/// the response did not cover follow in input order with the fail-open
/// verdict. A control matched by several sections keeps the first verdict.
pub fn extract_assessments(response: &str, controls: &[ControlRef]) -> Vec<AssessmentResult> {
    let mut results = Vec::with_capacity(controls.len());
    let mut seen: HashSet<&str> = HashSet::new();

    let sections: Vec<&str> = SECTION_SPLIT_RE.split(response).collect();

    if sections.len() > 1 {
        // The first piece is whatever precedes the first marker.
        for (i, raw) in sections.iter().skip(1).enumerate() {
            let section = raw.trim();
            let control = controls
                .iter()
                .find(|c| mentions(section, c))
                .or_else(|| controls.get(i));
            if let Some(control) = control {
                push_unique(&mut results, &mut seen, control, section);
            }
        }
    } else {
        let pieces = split_on_control_refs(response);
        debug!(pieces = pieces.len(), "no section markers, split on control references");
        for (token, content) in pieces {
            let control = controls.iter().find(|c| {
                mentions(content, c)
                    || (!c.control_number.is_empty() && token.contains(&c.control_number))
            });
            if let Some(control) = control {
                push_unique(&mut results, &mut seen, control, content);
            }
        }
    }

    for control in controls {
        if !seen.contains(control.control_number.as_str()) {
            warn!(
                control = %control.control_number,
                "no assessment found for control, defaulting to applicable"
            );
            seen.insert(control.control_number.as_str());
            results.push(AssessmentResult::required(control.control_number.clone()));
        }
    }

    results
}

fn push_unique<'a>(
    results: &mut Vec<AssessmentResult>,
    seen: &mut HashSet<&'a str>,
    control: &'a ControlRef,
    section: &str,
) {
    if seen.insert(control.control_number.as_str()) {
        results.push(parse_control_section(section, control));
    } else {
        debug!(control = %control.control_number, "ignoring repeated section for control");
    }
}

/// True if the text names the control by number or title.
fn mentions(text: &str, control: &ControlRef) -> bool {
    (!control.control_number.is_empty() && text.contains(&control.control_number))
        || (!control.title.is_empty() && text.contains(&control.title))
}

/// Pair each line-leading control reference with the text up to the next one.
fn split_on_control_refs(response: &str) -> Vec<(&str, &str)> {
    let matches: Vec<_> = CONTROL_REF_RE
        .captures_iter(response)
        .filter_map(|caps| Some((caps.get(0)?, caps.get(1)?)))
        .collect();

    matches
        .iter()
        .enumerate()
        .map(|(i, (whole, token))| {
            let end = matches
                .get(i + 1)
                .map(|(next, _)| next.start())
                .unwrap_or(response.len());
            (token.as_str(), &response[whole.end()..end])
        })
        .collect()
}

/// Read the verdict and, when not required, the justification from one section.
pub fn parse_control_section(section: &str, control: &ControlRef) -> AssessmentResult {
    let is_required = REQUIRED_RES
        .iter()
        .find_map(|re| re.captures(section))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().eq_ignore_ascii_case("yes"))
        .unwrap_or(true);

    let reason = (!is_required).then(|| extract_reason(section));

    AssessmentResult {
        control_number: control.control_number.clone(),
        is_required,
        reason,
    }
}

fn extract_reason(section: &str) -> String {
    let captured = REASON_RES
        .iter()
        .find_map(|re| re.captures(section))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().replace('\n', " "))
        .unwrap_or_default();

    let reason = if captured.is_empty() {
        PLACEHOLDER_REASON.to_string()
    } else {
        captured
    };

    CONTEXT_ENTRY_RES.iter().fold(reason, |acc, re| {
        re.replace_all(&acc, ORGANIZATION_VOICE).into_owned()
    })
}
