//! Analysis stage
//!
//! Compares what the uploaded document covers against what research found:
//! - Theme extraction from free text via LLM
//! - Fuzzy gap / overlap classification
//! - Report outline generation with a fixed fallback

mod engine;
mod gaps;
mod outline;
mod themes;

pub use engine::{research_text, AnalysisEngine};
pub use gaps::{compare, is_similar, GapAnalysis};
pub use outline::OutlineGenerator;
pub use themes::{ThemeExtractor, THEME_FALLBACK};

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Ordered lowercase short phrases
pub type ThemeSet = Vec<String>;

/// Section priority; unknown values read as medium
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
            Some("high") => Priority::High,
            Some("low") => Priority::Low,
            _ => Priority::Medium,
        })
    }
}

/// One topic listed under an outline section
///
/// LLMs emit either bare strings or small objects; both resolve to a label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum SectionTopic {
    Plain(String),
    Labeled { label: String },
}

impl Serialize for SectionTopic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SectionTopic::Plain(text) => serializer.serialize_str(text),
            SectionTopic::Labeled { label } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("label", label)?;
                map.end()
            }
        }
    }
}

impl SectionTopic {
    pub fn as_str(&self) -> &str {
        match self {
            SectionTopic::Plain(text) => text,
            SectionTopic::Labeled { label } => label,
        }
    }
}

impl From<Value> for SectionTopic {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => SectionTopic::Plain(text),
            Value::Object(map) => {
                let label = ["topic", "name", "title", "label"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(map.clone()).to_string());
                SectionTopic::Labeled { label }
            }
            other => SectionTopic::Plain(other.to_string()),
        }
    }
}

impl From<&str> for SectionTopic {
    fn from(text: &str) -> Self {
        SectionTopic::Plain(text.to_string())
    }
}

/// A titled unit of the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub topics: Vec<SectionTopic>,
    #[serde(default)]
    pub priority: Priority,
}

impl OutlineSection {
    pub fn new(title: impl Into<String>, topics: &[&str], priority: Priority) -> Self {
        Self {
            title: title.into(),
            topics: topics.iter().copied().map(SectionTopic::from).collect(),
            priority,
        }
    }

    /// Topic labels in order
    pub fn topic_labels(&self) -> Vec<String> {
        self.topics.iter().map(|t| t.as_str().to_string()).collect()
    }
}

/// Ordered report sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default, deserialize_with = "lenient_sections")]
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Outline used when generation fails or yields nothing
    pub fn fallback_for(topic: &str) -> Self {
        Self {
            sections: vec![
                OutlineSection::new(
                    "Executive Summary",
                    &["key findings", "main conclusions"],
                    Priority::High,
                ),
                OutlineSection::new(
                    format!("Analysis of {}", topic),
                    &["current state", "key developments"],
                    Priority::High,
                ),
                OutlineSection::new(
                    "Detailed Findings",
                    &["research results", "data analysis"],
                    Priority::Medium,
                ),
                OutlineSection::new(
                    "Recommendations",
                    &["action items", "future directions"],
                    Priority::Medium,
                ),
            ],
        }
    }

    /// Outline the writer falls back to when handed an empty one
    pub fn writer_default() -> Self {
        Self {
            sections: vec![
                OutlineSection::new("Introduction", &["background", "scope"], Priority::High),
                OutlineSection::new("Analysis", &["key findings", "implications"], Priority::High),
                OutlineSection::new(
                    "Recommendations",
                    &["action items", "next steps"],
                    Priority::Medium,
                ),
            ],
        }
    }

    /// Read an outline out of arbitrary JSON; `None` without a `sections` array
    pub fn from_value(value: &Value) -> Option<Self> {
        let sections = value.get("sections")?.as_array()?;
        Some(Self {
            sections: keep_section_objects(sections),
        })
    }
}

fn keep_section_objects(items: &[Value]) -> Vec<OutlineSection> {
    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

fn lenient_sections<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<OutlineSection>, D::Error> {
    let items = Vec::<Value>::deserialize(deserializer)?;
    Ok(keep_section_objects(&items))
}

/// Output of the analysis stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub document_themes: ThemeSet,
    #[serde(default)]
    pub research_themes: ThemeSet,
    /// Research themes absent from the document
    #[serde(default)]
    pub gaps: ThemeSet,
    /// Research themes the document already covers
    #[serde(default)]
    pub overlaps: ThemeSet,
    #[serde(default, alias = "recommended_outline")]
    pub outline: Outline,
    /// Document length in characters
    #[serde(default)]
    pub document_length: usize,
    /// Sources the research stage handed over
    #[serde(default)]
    pub research_sources: usize,
}
