//! Writing stage
//!
//! Produces the final report from an outline and research data:
//! - Executive summary via LLM with a fixed fallback
//! - Rate-limited, sequential section generation
//! - Numbered references, markdown assembly and an HTML page

pub mod clock;
mod citations;
mod html;
mod report;
mod section;

pub use citations::CitationManager;
pub use clock::{Clock, MockClock, TokioClock};
pub use html::{markdown_to_html, render_page};
pub use report::{Report, ReportAssembler, ReportMetadata, ReportWriter, SECTION_WORD_TARGET};
pub use section::{
    fallback_section, SectionContext, SectionGenerator, DEFAULT_MIN_DELAY, DEFAULT_WORD_TARGET,
};
