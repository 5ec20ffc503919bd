//! Organisational profile produced by the context-analysis phase.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Structured summary of an organisation, distilled from its context entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalProfile {
    pub business_model: String,
    pub technology_stack: String,
    pub organizational_size: String,
    pub industry_context: String,
    pub security_practices: String,
    #[serde(default)]
    pub key_characteristics: Vec<String>,
}

impl OrganizationalProfile {
    /// Profile used when the model's answer cannot be decoded.
    pub fn fallback() -> Self {
        Self {
            business_model: "Unable to parse business model from context".into(),
            technology_stack: "Unable to parse technology stack from context".into(),
            organizational_size: "Unable to parse organizational size from context".into(),
            industry_context: "Unable to parse industry context from context".into(),
            security_practices: "Unable to parse security practices from context".into(),
            key_characteristics: vec![
                "Analysis parsing failed - using default assessment approach".into(),
            ],
        }
    }
}

/// Decode a profile from a completion that may wrap the JSON in prose or fences.
///
/// Takes the span from the first `{` to the last `}`; falls back to
/// [`OrganizationalProfile::fallback`] if that does not decode.
pub fn decode_profile(text: &str) -> OrganizationalProfile {
    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };

    match serde_json::from_str(json) {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "failed to parse organizational profile, using fallback");
            OrganizationalProfile::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_JSON: &str = r#"{
  "businessModel": "B2B SaaS for compliance automation",
  "technologyStack": "Next.js on AWS with Postgres",
  "organizationalSize": "12 people, fully remote",
  "industryContext": "Software, handles customer PII",
  "securityPractices": "SSO, MFA, quarterly access reviews",
  "keyCharacteristics": ["Fully remote", "No physical offices"]
}"#;

    #[test]
    fn decodes_bare_json() {
        let p = decode_profile(PROFILE_JSON);
        assert_eq!(p.business_model, "B2B SaaS for compliance automation");
        assert_eq!(p.key_characteristics, vec!["Fully remote", "No physical offices"]);
    }

    #[test]
    fn decodes_json_wrapped_in_prose_and_fences() {
        let text = format!("Here is the profile:\n```json\n{PROFILE_JSON}\n```\nLet me know!");
        let p = decode_profile(&text);
        assert_eq!(p.organizational_size, "12 people, fully remote");
    }

    #[test]
    fn missing_characteristics_default_to_empty() {
        let p = decode_profile(
            r#"{"businessModel":"a","technologyStack":"b","organizationalSize":"c",
                "industryContext":"d","securityPractices":"e"}"#,
        );
        assert!(p.key_characteristics.is_empty());
    }

    #[test]
    fn invalid_json_falls_back() {
        assert_eq!(decode_profile("no json here"), OrganizationalProfile::fallback());
        assert_eq!(decode_profile("{ not: valid }"), OrganizationalProfile::fallback());
        assert_eq!(
            decode_profile(r#"{"businessModel": "only one field"}"#),
            OrganizationalProfile::fallback()
        );
    }
}
