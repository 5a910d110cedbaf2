//! Report titles and download filenames derived from a topic

const CONTEXT_WORDS: &[&str] = &[
    "solutions",
    "analysis",
    "overview",
    "technologies",
    "systems",
    "applications",
    "strategies",
    "approaches",
];

/// Capitalize the first letter of every alphabetic run, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Professional report title for a topic
///
/// ```
/// use reportforge_common::pipeline::generate_title;
/// assert_eq!(generate_title("blockchain scalability"), "Blockchain Scalability Solutions");
/// assert_eq!(generate_title("quantum"), "Quantum Analysis");
/// ```
pub fn generate_title(topic: &str) -> String {
    let title = title_case(topic.trim());
    let lower = title.to_lowercase();

    match title.split_whitespace().count() {
        1 => format!("{} Analysis", title),
        2 if !CONTEXT_WORDS.iter().any(|w| lower.contains(w)) => {
            if lower.contains("ethics") {
                title
            } else if lower.contains("scalability") {
                format!("{} Solutions", title)
            } else if lower.contains("energy") {
                format!("{} Technologies", title)
            } else {
                format!("{} Overview", title)
            }
        }
        _ => title,
    }
}

/// Filesystem-safe base name for a title
pub fn generate_filename(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
