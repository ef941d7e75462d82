// src/process.rs
//! Per-article processing: required-field gate, sentiment analysis via the
//! gateway, metadata normalization, and validation of the assembled record.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::{analysis_prompt, SharedGateway};
use crate::interpret::{self, Verdict};
use crate::normalize::{normalize_date, normalize_tickers};
use crate::rubric::{SCORE_MAX, SCORE_MIN};
use crate::sink::{SharedSink, SinkLevel};

/// One raw article record as scraped. Nothing is guaranteed present; the
/// processor decides what is usable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawArticle {
    pub title: Option<String>,
    pub content: Option<String>,
    /// String in one of several formats, epoch number, or missing.
    pub date: Value,
    /// May contain non-string junk from the scraper.
    pub tickers: Option<Vec<Value>>,
    #[serde(rename = "newsProvider")]
    pub news_provider: Option<String>,
    pub url: Option<String>,
}

/// One fully processed output row. Immutable once appended to the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedArticle {
    pub title: String,
    pub date: Option<NaiveDateTime>,
    pub tickers: String,
    pub content: String,
    pub provider: String,
    pub url: String,
    pub sentiment_score: u8,
    pub sentiment_description: String,
    pub confidence: f64,
    pub processed_at: String,
}

pub struct ArticleProcessor {
    gateway: SharedGateway,
    sink: SharedSink,
}

impl ArticleProcessor {
    pub fn new(gateway: SharedGateway, sink: SharedSink) -> Self {
        Self { gateway, sink }
    }

    /// Process one raw article. `None` means the article was rejected
    /// (missing title or content) and excluded from the output; the batch
    /// carries on. Gateway and parsing trouble never reject an article —
    /// they degrade to the neutral fallback verdict.
    pub async fn process(&self, raw: &RawArticle) -> Option<ProcessedArticle> {
        let title = raw.title.as_deref().unwrap_or("").trim();
        let content = raw.content.as_deref().unwrap_or("").trim();

        if title.is_empty() || content.is_empty() {
            self.sink.emit(
                SinkLevel::Warning,
                &format!(
                    "article missing title or content: {}",
                    raw.url.as_deref().unwrap_or("No URL")
                ),
            );
            return None;
        }

        // Title repeated to weight the sentiment signal toward headline framing.
        let analysis_text = format!("{title} {title} {content}");
        let verdict = self.analyze(&analysis_text).await;

        let processed = ProcessedArticle {
            title: title.to_string(),
            date: normalize_date(&raw.date),
            tickers: normalize_tickers(raw.tickers.as_deref().unwrap_or(&[])),
            content: content.to_string(),
            provider: raw.news_provider.clone().unwrap_or_default(),
            url: raw.url.clone().unwrap_or_default(),
            sentiment_score: verdict.score,
            sentiment_description: verdict.description.to_string(),
            confidence: verdict.confidence.weight(),
            processed_at: Utc::now().to_rfc3339(),
        };

        self.sink.article_processed(
            &processed.title,
            processed.sentiment_score,
            processed.confidence,
        );
        Some(processed)
    }

    /// Invoke the gateway and interpret the response. This path never raises
    /// outward; any failure yields the fallback verdict.
    async fn analyze(&self, text: &str) -> Verdict {
        let prompt = analysis_prompt(text);
        match self.gateway.invoke(&prompt).await {
            Ok(response) => {
                let outcome = interpret::parse(&response);
                if outcome.is_fallback() {
                    self.sink.emit(
                        SinkLevel::Warning,
                        "could not extract sentiment score from model response",
                    );
                }
                outcome.into_verdict()
            }
            Err(e) => {
                self.sink
                    .emit(SinkLevel::Error, &format!("gateway call failed: {e:#}"));
                interpret::fallback().into_verdict()
            }
        }
    }

    /// Check a processed record for completeness. Title, date, and content
    /// must be present, the description non-empty, and the score must sit
    /// inside the rubric band [1, 5]. Confidence is always one of the three
    /// discrete weights, so only presence of the textual fields is tested.
    pub fn validate(record: Option<&ProcessedArticle>) -> bool {
        let Some(r) = record else {
            return false;
        };
        if r.title.is_empty() || r.content.is_empty() {
            return false;
        }
        if r.date.is_none() {
            return false;
        }
        if r.sentiment_description.is_empty() {
            return false;
        }
        (SCORE_MIN..=SCORE_MAX).contains(&r.sentiment_score)
    }
}
