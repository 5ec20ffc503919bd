//! Prompt templates for the two-phase applicability assessment and the systems description.

use std::fmt::Write;

use soa_core::{ContextEntry, ControlRef};

use crate::profile::OrganizationalProfile;

// ── Phase 1: context analysis ──

pub const CONTEXT_ANALYSIS_SYSTEM_PROMPT: &str = "\
You are an organisational analyst preparing a company for an ISO 27001 assessment.

Analyse the context entries you are given and summarise the organisation along five dimensions:
1. BUSINESS MODEL: what the company does and how it operates.
2. TECHNOLOGY STACK: the technologies, systems and infrastructure it uses.
3. ORGANIZATIONAL SIZE: headcount, team structure and complexity.
4. INDUSTRY CONTEXT: sector, applicable regulation and typical risks.
5. SECURITY PRACTICES: security measures and policies already in place.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"businessModel\": \"...\",
  \"technologyStack\": \"...\",
  \"organizationalSize\": \"...\",
  \"industryContext\": \"...\",
  \"securityPractices\": \"...\",
  \"keyCharacteristics\": [\"5-8 characteristics that affect ISO 27001 control applicability\"]
}

Stick to facts stated in the context entries.";

// ── Phase 2: control assessment ──

pub const ASSESSMENT_SYSTEM_PROMPT: &str = "\
You are a Chief Information Security Officer deciding which ISO 27001 Annex A controls apply to an organisation.

Use the organisational profile you are given. Assume every control is applicable unless the profile gives \
specific evidence that the control addresses activities, risks or structures the organisation does not have. \
Err on the side of inclusion and keep decisions consistent across similar controls.

For each control, answer in exactly this format:

Control Objective: [Control Number] - [Control Title]
Is this control required?: Yes or No
Why is this not applicable?: [Only if \"No\". Write in the first person from the organisation's perspective, \
e.g. \"Our organization does not...\" or \"We do not...\"]

The answer is parsed programmatically. Keep to this format and do not cite context entries by number.";

// ── Systems description ──

pub const SYSTEMS_DESCRIPTION_SYSTEM_PROMPT: &str = "\
You are a senior platform architect writing the systems description section of an engineering due diligence document.

Write 1-3 cohesive paragraphs in plain present tense covering hosting, data storage, application framework, \
deployment, content delivery, security tooling, background processing, observability, email, version control \
and notable third-party services.

Prefer facts from the organisation context. Where the context is silent, assume modern cloud-native equivalents. \
Leave out overly specific details such as network ranges, instance sizes or repository names. \
Keep the tone objective and avoid marketing language.";

/// Render context entries as numbered question/answer blocks.
pub fn render_context_entries(entries: &[ContextEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "Context Entry {}:", i + 1);
        let _ = writeln!(out, "Question: {}", entry.question);
        let _ = writeln!(out, "Answer: {}", entry.answer);
        if !entry.tags.is_empty() {
            let _ = writeln!(out, "Tags: {}", entry.tags.join(", "));
        }
        out.push('\n');
    }
    out
}

pub fn build_context_analysis_prompt(entries: &[ContextEntry]) -> String {
    format!(
        "COMPANY CONTEXT ENTRIES TO ANALYZE:\n\n\
         {entries}\n\
         Analyze the context entries above and provide the organizational profile in the specified JSON format.",
        entries = render_context_entries(entries),
    )
}

pub fn build_assessment_prompt(profile: &OrganizationalProfile, controls: &[ControlRef]) -> String {
    let mut out = String::from("ORGANIZATIONAL PROFILE:\n\n");
    let _ = write!(
        out,
        "Business Model: {}\n\n\
         Technology Stack: {}\n\n\
         Organizational Size: {}\n\n\
         Industry Context: {}\n\n\
         Security Practices: {}\n\n\
         Key Characteristics:\n",
        profile.business_model,
        profile.technology_stack,
        profile.organizational_size,
        profile.industry_context,
        profile.security_practices,
    );
    for (i, c) in profile.key_characteristics.iter().enumerate() {
        let _ = writeln!(out, "{}. {c}", i + 1);
    }

    out.push_str("\nISO 27001 CONTROLS TO ASSESS:\n\n");
    for (i, c) in controls.iter().enumerate() {
        let _ = write!(
            out,
            "Control {}: {} - {}\nObjective: {}\n\n",
            i + 1,
            c.control_number,
            c.title,
            c.objective
        );
    }

    out.push_str(
        "Assess every control above against the profile, in the format given in the system prompt.\n\
         Begin your assessment now:",
    );
    out
}

pub fn build_systems_description_prompt(entries: &[ContextEntry]) -> String {
    format!(
        "ORGANIZATION CONTEXT ENTRIES:\n\n\
         {entries}\n\
         Generate the systems description now.",
        entries = render_context_entries(entries),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str, answer: &str, tags: &[&str]) -> ContextEntry {
        ContextEntry {
            id: "ctx".into(),
            organization_id: "org".into(),
            question: question.into(),
            answer: answer.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn context_entries_numbered_with_optional_tags() {
        let rendered = render_context_entries(&[
            entry("Where is data hosted?", "AWS", &["infra", "cloud"]),
            entry("Do you have offices?", "No", &[]),
        ]);
        assert_eq!(
            rendered,
            "Context Entry 1:\nQuestion: Where is data hosted?\nAnswer: AWS\nTags: infra, cloud\n\n\
             Context Entry 2:\nQuestion: Do you have offices?\nAnswer: No\n\n"
        );
    }

    #[test]
    fn assessment_prompt_lists_controls_in_order() {
        let controls = vec![
            ControlRef {
                control_number: "5.1".into(),
                title: "Policies for information security".into(),
                objective: "Define policies".into(),
            },
            ControlRef {
                control_number: "5.2".into(),
                title: "Roles".into(),
                objective: "Define roles".into(),
            },
        ];
        let prompt = build_assessment_prompt(&OrganizationalProfile::fallback(), &controls);
        assert!(prompt.contains("Control 1: 5.1 - Policies for information security\nObjective: Define policies\n"));
        assert!(prompt.contains("Control 2: 5.2 - Roles\n"));
        assert!(prompt.contains("1. Analysis parsing failed"));
        assert!(prompt.find("5.1").unwrap() < prompt.find("5.2").unwrap());
    }

    #[test]
    fn assessment_template_matches_extractor_labels() {
        assert!(ASSESSMENT_SYSTEM_PROMPT.contains("Control Objective:"));
        assert!(ASSESSMENT_SYSTEM_PROMPT.contains("Is this control required?:"));
        assert!(ASSESSMENT_SYSTEM_PROMPT.contains("Why is this not applicable?:"));
    }

    #[test]
    fn systems_description_prompt_ends_with_instruction() {
        let prompt = build_systems_description_prompt(&[entry("Stack?", "Rust", &[])]);
        assert!(prompt.starts_with("ORGANIZATION CONTEXT ENTRIES:\n\nContext Entry 1:"));
        assert!(prompt.ends_with("Generate the systems description now."));
    }
}
