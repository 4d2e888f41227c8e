//! Topic detection for gallery images.
//!
//! Labels are derived from the record's own text on every read and are never
//! stored. Matching is whole-word so that e.g. "pancerinho" does not count as
//! "panceri".

use crate::models::DEFAULT_SECTION;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

struct TopicRule {
    label: &'static str,
    keywords: &'static [&'static str],
}

const TOPIC_RULES: &[TopicRule] = &[
    TopicRule { label: "Panceri", keywords: &["panceri"] },
    TopicRule { label: "Pompeia", keywords: &["pompeia", "pizzamiglio"] },
    TopicRule { label: "Scavino & Bertuzzi", keywords: &["scavino", "bertuzzi"] },
];

struct CompiledRule {
    label: &'static str,
    pattern: Regex,
}

static COMPILED_RULES: OnceLock<Vec<CompiledRule>> = OnceLock::new();

fn compiled_rules() -> &'static [CompiledRule] {
    COMPILED_RULES.get_or_init(|| {
        TOPIC_RULES
            .iter()
            .filter_map(|rule| {
                let alternatives: Vec<String> = rule.keywords.iter().map(|k| regex::escape(k)).collect();
                let source = format!(r"\b(?:{})\b", alternatives.join("|"));
                match Regex::new(&source) {
                    Ok(pattern) => Some(CompiledRule { label: rule.label, pattern }),
                    Err(e) => {
                        log::error!("Invalid topic pattern for '{}': {}", rule.label, e);
                        None
                    }
                }
            })
            .collect()
    })
}

/// Labels a topic rule can produce. An assigned section equal to one of these
/// is used as a fallback when no keyword matches.
pub fn known_topics() -> Vec<&'static str> {
    TOPIC_RULES.iter().map(|rule| rule.label).collect()
}

/// File name without extension, with `_` and `-` turned into spaces.
fn file_name_words(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    stem.to_lowercase().replace(['_', '-'], " ")
}

/// Builds the lower-cased text the rules are matched against.
pub fn scan_text(
    title: Option<&str>,
    corroboration: Option<&str>,
    file_name: &str,
    assigned_section: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        parts.push(title.to_lowercase());
    }
    if let Some(text) = corroboration.filter(|t| !t.is_empty()) {
        parts.push(text.to_lowercase());
    }
    if !file_name.is_empty() {
        parts.push(file_name_words(file_name));
    }
    if let Some(section) = assigned_section.filter(|s| !s.is_empty() && *s != DEFAULT_SECTION) {
        parts.push(section.to_lowercase());
    }
    parts.join(" ")
}

/// Returns the topic labels of a gallery record. Never empty; sorted.
pub fn detect_topics(
    title: Option<&str>,
    corroboration: Option<&str>,
    file_name: &str,
    assigned_section: Option<&str>,
) -> Vec<String> {
    let text = scan_text(title, corroboration, file_name, assigned_section);

    let mut detected: BTreeSet<&'static str> = compiled_rules()
        .iter()
        .filter(|rule| rule.pattern.is_match(&text))
        .map(|rule| rule.label)
        .collect();

    if detected.is_empty() {
        if let Some(section) = assigned_section {
            if let Some(label) = known_topics().into_iter().find(|label| *label == section) {
                detected.insert(label);
            }
        }
    }

    if detected.is_empty() {
        return vec![DEFAULT_SECTION.to_string()];
    }
    detected.into_iter().map(str::to_string).collect()
}
