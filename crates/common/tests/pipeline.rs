//! End-to-end pipeline behaviour with scripted LLM and search backends

use reportforge_common::analysis::{Outline, OutlineSection, Priority};
use reportforge_common::config::PipelineConfig;
use reportforge_common::document::LocalDocumentExtractor;
use reportforge_common::llm::{CompletionRequest, MockLlmClient};
use reportforge_common::pipeline::{
    PipelineOrchestrator, PipelineRun, PipelineState, RemoteStages, Stage, Stages,
};
use reportforge_common::research::{ResearchEngine, ResearchResult};
use reportforge_common::search::{MockSearchClient, SearchResult};
use reportforge_common::writer::{Clock, MockClock, ReportWriter, SectionGenerator};
use reportforge_common::AppError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOPIC: &str = "blockchain scalability";
const DOCUMENT: &str = "Layer 2 solutions like Lightning Network show promise.";

fn result(url: &str) -> SearchResult {
    SearchResult::new(url, "Scaling update", "Throughput notes")
}

/// 12 results over three sub-queries with one reuters, medium and reddit link each
fn search_backend() -> MockSearchClient {
    MockSearchClient::new()
        .with_results(
            "q1",
            vec![
                result("https://www.reddit.com/r/ethereum/1"),
                result("https://example.net/1"),
                result("https://example.net/2"),
                result("https://example.net/3"),
            ],
        )
        .with_results(
            "q2",
            vec![
                result("https://example.net/4"),
                result("https://medium.com/@dev/rollups"),
                result("https://example.net/5"),
                result("https://example.net/6"),
            ],
        )
        .with_results(
            "q3",
            vec![
                result("https://example.net/7"),
                result("https://example.net/8"),
                result("https://www.reuters.com/technology/scaling"),
                result("https://example.net/9"),
            ],
        )
}

/// Answers each prompt kind with a fixed reply
fn scripted_llm(request: &CompletionRequest) -> Result<String, String> {
    let prompt = request.prompt.as_str();
    let reply = if prompt.contains("Break down this research topic") {
        r#"["q1", "q2", "q3"]"#
    } else if prompt.contains("executive summary") {
        "Scaling is moving to layer 2."
    } else if prompt.contains("key findings") {
        r#"["Rollups cut fees by batching transactions", "State channels suit micropayments"]"#
    } else if prompt.contains("main themes") && prompt.contains("Lightning Network") {
        r#"["Layer 2", "Lightning Network"]"#
    } else if prompt.contains("main themes") {
        r#"["layer 2 solutions", "zero-knowledge proofs"]"#
    } else if prompt.contains("structured outline") {
        r#"```json
{"sections": [
  {"title": "Introduction", "topics": ["scope"], "priority": "high"},
  {"title": "Rollups", "topics": [{"name": "fees"}], "priority": "urgent"}
]}
```"#
    } else {
        "Section body text."
    };
    Ok(reply.to_string())
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        max_sources: 20,
        section_min_delay_ms: 0,
        ..PipelineConfig::default()
    }
}

fn position(research: &ResearchResult, domain: &str) -> usize {
    research
        .sources
        .iter()
        .position(|s| s.source.url.contains(domain))
        .unwrap_or_else(|| panic!("{domain} missing from sources"))
}

#[tokio::test]
async fn test_research_ranks_trusted_above_medium_above_low() {
    let engine = ResearchEngine::new(
        Arc::new(MockLlmClient::from_fn(scripted_llm)),
        Arc::new(search_backend()),
    );

    let research = engine.research(TOPIC, 20).await;

    assert_eq!(research.total_sources_analyzed, 12);
    assert_eq!(research.sources.len(), 12);
    assert!(position(&research, "reuters.com") < position(&research, "medium.com"));
    assert!(position(&research, "medium.com") < position(&research, "reddit.com"));
    assert!(research
        .sources
        .windows(2)
        .all(|w| w[0].credibility_score >= w[1].credibility_score));
}

#[tokio::test]
async fn test_one_failing_sub_query_counts_only_successful_results() {
    let search = MockSearchClient::new()
        .with_results("q1", vec![result("https://a.com/1"), result("https://a.com/2")])
        .with_failure("q2", "quota exhausted")
        .with_results("q3", vec![result("https://b.com/1"), result("https://b.com/2"), result("https://b.com/3")]);
    let search = Arc::new(search);
    let engine = ResearchEngine::new(Arc::new(MockLlmClient::from_fn(scripted_llm)), search.clone());

    let research = engine.research(TOPIC, 10).await;

    assert_eq!(search.queries(), vec!["q1", "q2", "q3"]);
    assert_eq!(research.total_sources_analyzed, 5);
    assert_eq!(research.sources.len(), 5);
}

#[tokio::test]
async fn test_full_pipeline_end_to_end() {
    let llm = Arc::new(MockLlmClient::from_fn(scripted_llm));
    let config = pipeline_config();
    let stages = Stages::local(llm, Arc::new(search_backend()), &config);
    let orchestrator = PipelineOrchestrator::new(Arc::new(LocalDocumentExtractor), stages, config);

    let mut run = PipelineRun::new(TOPIC);
    let outcome = orchestrator
        .execute(&mut run, DOCUMENT.as_bytes(), "notes.txt", None)
        .await
        .unwrap();

    assert_eq!(run.state(), PipelineState::Done);
    assert_eq!(outcome.topic, TOPIC);
    assert_eq!(outcome.document_analysis.text_length, DOCUMENT.chars().count());
    assert_eq!(outcome.document_analysis.themes, vec!["layer 2", "lightning network"]);
    assert_eq!(outcome.research_summary.sources_found, 12);
    assert_eq!(outcome.analysis.overlaps, vec!["layer 2 solutions"]);
    assert_eq!(outcome.analysis.gaps, vec!["zero-knowledge proofs"]);

    let report = &outcome.report;
    assert_eq!(report.metadata.section_count, 2);
    assert_eq!(report.metadata.source_count, 12);
    assert_eq!(report.sections[1], "## Rollups\n\nSection body text.");
    assert!(report.markdown.starts_with("# blockchain scalability\n"));
    assert!(report.markdown.contains("Scaling is moving to layer 2."));
    assert!(report.references.contains("[Scaling update](https://www.reuters.com/technology/scaling)"));
    assert!(report.html.contains("<h2>Executive Summary</h2>"));
}

#[tokio::test]
async fn test_failing_writer_aborts_without_partial_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/write"))
        .respond_with(ResponseTemplate::new(500).set_body_string("writer crashed"))
        .expect(1)
        .mount(&server)
        .await;

    let config = pipeline_config();
    let local = Stages::local(
        Arc::new(MockLlmClient::from_fn(scripted_llm)),
        Arc::new(search_backend()),
        &config,
    );
    let remote = Arc::new(RemoteStages::new(server.uri(), server.uri(), server.uri()).unwrap());
    let stages = Stages::new(local.research, local.analysis, remote);
    let orchestrator = PipelineOrchestrator::new(Arc::new(LocalDocumentExtractor), stages, config);

    let mut run = PipelineRun::new(TOPIC);
    let err = orchestrator
        .execute(&mut run, DOCUMENT.as_bytes(), "notes.txt", None)
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some("writing"));
    assert!(matches!(err, AppError::StageFailed { .. }));
    assert!(err.to_string().contains("writer crashed"));
    assert_eq!(run.state(), PipelineState::Failed(Stage::Writing));
}

#[tokio::test]
async fn test_sections_are_spaced_by_minimum_delay() {
    let clock = Arc::new(MockClock::new());
    let section_calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let llm = {
        let clock = clock.clone();
        let section_calls = section_calls.clone();
        MockLlmClient::from_fn(move |request| {
            if request.prompt.contains("report section") {
                section_calls.lock().unwrap().push(clock.now());
            }
            scripted_llm(request)
        })
    };
    let llm = Arc::new(llm);
    let min_delay = Duration::from_secs(5);
    let writer = ReportWriter::new(llm.clone())
        .with_section_generator(SectionGenerator::with_clock(llm, clock.clone(), min_delay));

    let outline = Outline {
        sections: vec![
            OutlineSection::new("Introduction", &["scope"], Priority::High),
            OutlineSection::new("Rollups", &["fees"], Priority::Medium),
            OutlineSection::new("Outlook", &["adoption"], Priority::Low),
        ],
    };
    let report = writer
        .write_report(TOPIC, &outline, &ResearchResult::default(), DOCUMENT)
        .await;

    let stamps = section_calls.lock().unwrap().clone();
    assert_eq!(report.metadata.section_count, 3);
    assert_eq!(stamps.len(), 3);
    assert!(stamps.windows(2).all(|w| w[1] - w[0] >= min_delay));
    assert_eq!(clock.elapsed(), Duration::from_secs(10));
}
