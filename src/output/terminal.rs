// Colored terminal output for decisions, language reports and history.

use colored::Colorize;

use crate::db::DetectionRecord;
use crate::language::LanguageTag;
use crate::policy::Action;
use crate::service::Decision;

use super::truncate_chars;

/// Cut-off for the plain toxic / not toxic verdict.
const TOXIC_THRESHOLD: f64 = 0.5;

/// Display one analyzed piece of content and its recommended action.
pub fn display_decision(content: &str, decision: &Decision) {
    let outcome = &decision.outcome;

    println!("\n{}", "=== Toxicity Analysis ===".bold());
    println!("  Content:   \"{}\"", truncate_chars(content, 80).yellow());
    println!("  Language:  {}", decision.language);
    println!("  Score:     {}", format!("{:.3}", outcome.score).red());
    println!("  Provider:  {}", outcome.provider.blue());
    if outcome.categories.is_empty() {
        println!("  Categories: {}", "none detected".green());
    } else {
        println!("  Categories: {}", outcome.categories.join(", ").yellow());
    }
    if let Some(explanation) = &outcome.explanation {
        println!("  Note:      {}", explanation.dimmed());
    }

    let t = &decision.thresholds;
    println!(
        "  {}",
        format!(
            "Thresholds ({}): block {:.2} / flag {:.2} / warn {:.2}",
            decision.language, t.block, t.flag, t.warn
        )
        .dimmed()
    );

    let toxic = if outcome.is_toxic(TOXIC_THRESHOLD) {
        "yes".red()
    } else {
        "no".green()
    };
    println!("  Toxic:     {toxic} (score >= {TOXIC_THRESHOLD})");

    println!("\n  Recommended action: {}", colorize_action(decision.action));
}

/// Display the language analysis of a piece of text.
pub fn display_language_report(
    detected: LanguageTag,
    primary: LanguageTag,
    multilingual: bool,
    normalized: &str,
) {
    println!("\n{}", "=== Language Detection ===".bold());
    println!("  Detected:     {detected}");
    println!("  Primary:      {primary}");
    println!("  Multilingual: {}", if multilingual { "yes" } else { "no" });
    println!("  Normalized:   {normalized}");
}

/// Display recently persisted decisions, newest first.
pub fn display_history(records: &[DetectionRecord]) {
    if records.is_empty() {
        println!("No decisions recorded yet. Run `toxfilter analyze` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Recent Decisions ({}) ===", records.len()).bold()
    );
    println!(
        "  {:<26} {:<12} {:>6}  {:<6} {:<4} {}",
        "When".dimmed(),
        "Provider".dimmed(),
        "Score".dimmed(),
        "Action".dimmed(),
        "Lang".dimmed(),
        "Categories".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for record in records {
        let action = match record.action_taken.as_str() {
            "block" => record.action_taken.red().bold(),
            "flag" => record.action_taken.yellow(),
            "warn" => record.action_taken.blue(),
            _ => record.action_taken.green(),
        };
        println!(
            "  {:<26} {:<12} {:>6.3}  {:<6} {:<4} {}",
            truncate_chars(&record.created_at, 25),
            record.provider,
            record.toxicity_score,
            action,
            record.language,
            record.categories.join(", "),
        );
    }
    println!();
}

fn colorize_action(action: Action) -> colored::ColoredString {
    match action {
        Action::Block => "BLOCK - content should be blocked".red().bold(),
        Action::Flag => "FLAG - content should be flagged for review".yellow().bold(),
        Action::Warn => "WARN - content should trigger a warning".blue(),
        Action::Allow => "ALLOW - content is acceptable".green(),
    }
}
