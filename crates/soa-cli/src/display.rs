//! Terminal rendering for controls, assessment runs, and compliance API records.

use soa_ai::{AssessmentRun, OrganizationalProfile};
use soa_core::api::{Comment, ContextEntry, Task};
use soa_core::{Applicability, ControlRecord, ControlStats};

const MAX_LIST_ITEMS: usize = 10;
const TITLE_WIDTH: usize = 60;

// ── Controls ──

/// Print one control as a vertical card.
pub fn print_control_card(c: &ControlRecord) {
    println!("=== {} ===", c.control_number);
    println!("{}", c.title);
    println!();

    println!("Objective");
    println!("  {}", c.objective);
    println!();

    println!("Drivers");
    print_field("business", yes_no(c.drivers.business));
    print_field("risk", yes_no(c.drivers.risk));
    print_field("legal", yes_no(c.drivers.legal));
    print_field("contract", yes_no(c.drivers.contract));
    println!();

    println!("Applicability");
    print_field("required", yes_no(c.is_required));
    print_field("status", c.is_applicable.as_str());
    if !c.date_last_assessed.is_empty() {
        print_field("date_last_assessed", &c.date_last_assessed);
    }
    if !c.not_applicable_reason.is_empty() {
        print_field("reason", &c.not_applicable_reason);
    }
}

/// One line per control: number, status, truncated title.
pub fn print_control_table(records: &[ControlRecord]) {
    for c in records {
        let marker = match c.is_applicable {
            Applicability::Applicable => "A ",
            Applicability::NotApplicable => "NA",
        };
        println!("  {:<6} {marker}  {}", c.control_number, truncate(&c.title));
    }
}

pub fn print_stats(stats: &ControlStats) {
    println!("Controls");
    print_field("total", &stats.total.to_string());
    print_field(
        "applicable",
        &format!("{} ({}%)", stats.applicable, stats.applicable_percentage),
    );
    print_field(
        "not_applicable",
        &format!(
            "{} ({}%)",
            stats.not_applicable, stats.not_applicable_percentage
        ),
    );
}

// ── Assessment ──

pub fn print_profile(profile: &OrganizationalProfile) {
    println!("Organizational Profile");
    print_field("business_model", &profile.business_model);
    print_field("technology_stack", &profile.technology_stack);
    print_field("organizational_size", &profile.organizational_size);
    print_field("industry_context", &profile.industry_context);
    print_field("security_practices", &profile.security_practices);
    print_list("key_characteristics", &profile.key_characteristics);
    println!();
}

pub fn print_run(run: &AssessmentRun) {
    print_profile(&run.organizational_profile);

    println!("Assessment");
    print_field("processed", &run.total_processed.to_string());
    print_field("required", &run.required_count().to_string());
    print_field("not_required", &run.not_required_count().to_string());
    print_field("elapsed_ms", &run.processing_time_ms.to_string());

    let excluded: Vec<_> = run.results.iter().filter(|r| !r.is_required).collect();
    if !excluded.is_empty() {
        println!();
        println!("Not Applicable ({}):", excluded.len());
        for r in excluded {
            println!(
                "  {:<6} {}",
                r.control_number,
                r.reason.as_deref().unwrap_or("-")
            );
        }
    }
}

// ── Compliance API ──

pub fn print_tasks(tasks: &[Task]) {
    println!("Tasks ({}):", tasks.len());
    for t in tasks {
        let status = serde_json::to_value(t.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!("  {:<26} {:<12} {}", t.id, status, truncate(&t.title));
    }
}

pub fn print_context(entries: &[ContextEntry]) {
    println!("Context entries ({}):", entries.len());
    for (i, e) in entries.iter().enumerate() {
        println!();
        println!("  {}. {}", i + 1, e.question);
        println!("     {}", e.answer);
        if !e.tags.is_empty() {
            println!("     tags: {}", e.tags.join(", "));
        }
    }
}

pub fn print_comments(comments: &[Comment]) {
    println!("Comments ({}):", comments.len());
    for c in comments {
        println!();
        println!("  {} <{}>  {}", c.author.name, c.author.email, c.created_at);
        println!("    {}", c.content);
        let names: Vec<String> = c.attachments.iter().map(|a| a.name.clone()).collect();
        print_list("    attachments", &names);
    }
}

// ── Helpers ──

fn print_field(name: &str, value: &str) {
    println!("  {name:<26} {value}");
}

fn print_list(name: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let show = items.len().min(MAX_LIST_ITEMS);
    println!("  {name:<26} {}", items[..show].join(", "));
    if items.len() > MAX_LIST_ITEMS {
        println!("  {:<26} ... and {} more", "", items.len() - MAX_LIST_ITEMS);
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn truncate(s: &str) -> String {
    if s.chars().count() > TITLE_WIDTH {
        let head: String = s.chars().take(TITLE_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
