// tests/process_articles.rs
// Processor behavior around the gateway boundary: rejection of incomplete
// articles, headline weighting in the prompt, degrade on gateway failure.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;

use news_sentiment_pipeline::gateway::{MockGateway, ModelGateway};
use news_sentiment_pipeline::process::{ArticleProcessor, RawArticle};
use news_sentiment_pipeline::sink::{MemorySink, SinkLevel};

/// Gateway that always fails, for the degrade path.
struct FailingGateway;

#[async_trait]
impl ModelGateway for FailingGateway {
    async fn invoke(&self, _prompt: &str) -> Result<String> {
        bail!("connection refused");
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Gateway that records the prompt it was handed.
#[derive(Default)]
struct CapturingGateway {
    last_prompt: Mutex<Option<String>>,
}

#[async_trait]
impl ModelGateway for CapturingGateway {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok("REASONING: fine.\nSCORE: 4\nCONFIDENCE: Medium".to_string())
    }
    fn name(&self) -> &'static str {
        "capturing"
    }
}

fn article(title: &str, content: &str) -> RawArticle {
    RawArticle {
        title: Some(title.to_string()),
        content: Some(content.to_string()),
        date: json!("2023-12-25 10:30:00"),
        tickers: None,
        news_provider: None,
        url: Some("https://example.test/x".to_string()),
    }
}

#[tokio::test]
async fn empty_content_is_rejected_without_error() {
    let sink = Arc::new(MemorySink::new());
    let p = ArticleProcessor::new(Arc::new(MockGateway::neutral()), sink.clone());

    assert!(p.process(&article("Headline", "")).await.is_none());
    assert_eq!(sink.count(SinkLevel::Warning), 1);
}

#[tokio::test]
async fn missing_fields_entirely_are_rejected() {
    let sink = Arc::new(MemorySink::new());
    let p = ArticleProcessor::new(Arc::new(MockGateway::neutral()), sink);
    assert!(p.process(&RawArticle::default()).await.is_none());
}

#[tokio::test]
async fn title_is_doubled_in_the_analysis_prompt() {
    let gateway = Arc::new(CapturingGateway::default());
    let sink = Arc::new(MemorySink::new());
    let p = ArticleProcessor::new(gateway.clone(), sink);

    let out = p.process(&article("Rates rise", "Markets wobble.")).await;
    assert!(out.is_some());

    let prompt = gateway.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Rates rise Rates rise Markets wobble."));
    assert!(prompt.contains("SCORE: [single number 1-5]"));
}

#[tokio::test]
async fn gateway_failure_degrades_to_neutral_verdict() {
    let sink = Arc::new(MemorySink::new());
    let p = ArticleProcessor::new(Arc::new(FailingGateway), sink.clone());

    let out = p.process(&article("Headline", "Body.")).await.unwrap();
    assert_eq!(out.sentiment_score, 3);
    assert_eq!(out.confidence, 0.5);
    assert_eq!(sink.count(SinkLevel::Error), 1);
}
