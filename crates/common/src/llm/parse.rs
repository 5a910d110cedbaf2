//! Parsing helpers for free-form LLM output
//!
//! LLMs are asked for strict JSON but routinely wrap it in code fences,
//! prefix it with chatter, or answer with a numbered list instead. The
//! helpers here implement one shared policy: try JSON first, then fall back
//! to cleaned lines, and let the caller decide what an empty result means.

/// Where a parsed list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    /// Parsed as a JSON array of strings
    Json,
    /// Recovered line by line from plain text
    Lines,
}

/// List items recovered from an LLM reply
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedList {
    pub items: Vec<String>,
    pub source: ListSource,
}

/// Return the payload inside a markdown code fence, or the input unchanged
///
/// The text between the first and second fence markers is used, except that
/// a ```` ```json ```` fence anywhere in the reply is preferred over an earlier
/// bare fence. Replies with a single fenced block parse the same either way.
pub fn strip_code_fence(raw: &str) -> &str {
    if let Some(start) = raw.find("```json") {
        let rest = &raw[start + "```json".len()..];
        let end = rest.find("```").unwrap_or(rest.len());
        return rest[..end].trim();
    }

    let mut parts = raw.splitn(3, "```");
    match (parts.next(), parts.next()) {
        (Some(_), Some(inner)) => inner.trim(),
        _ => raw.trim(),
    }
}

/// Try to read a JSON array of strings out of an LLM reply
pub fn parse_json_list(raw: &str) -> Option<Vec<String>> {
    let fenced = strip_code_fence(raw);
    let bracketed = match (fenced.find('['), fenced.rfind(']')) {
        (Some(start), Some(end)) if start < end => Some(&fenced[start..=end]),
        _ => None,
    };

    [Some(raw.trim()), Some(fenced), bracketed]
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str::<Vec<String>>(candidate).ok())
        .map(|items| {
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
}

/// Strip list decoration from one line of plain-text output
///
/// Leading numbering, bullets, quotes and brackets go; trailing quotes,
/// brackets and commas go. Digits inside or at the end of the text stay.
pub fn clean_line(line: &str) -> String {
    line.trim()
        .trim_start_matches(|c: char| {
            c.is_ascii_digit() || c.is_whitespace() || "-*•.)\"'[]".contains(c)
        })
        .trim_end_matches(|c: char| c.is_whitespace() || "\"'[],".contains(c))
        .to_string()
}

/// Split plain text into cleaned, non-empty lines
pub fn parse_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Shared list policy: JSON array first, cleaned lines otherwise
pub fn parse_list(raw: &str) -> ParsedList {
    match parse_json_list(raw) {
        Some(items) => ParsedList {
            items,
            source: ListSource::Json,
        },
        None => ParsedList {
            items: parse_lines(raw),
            source: ListSource::Lines,
        },
    }
}
