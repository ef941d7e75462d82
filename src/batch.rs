// src/batch.rs
//! Batch driver: runs the processor over a collection of raw articles,
//! sorts the survivors by date, and serializes the fixed-schema CSV artifact.
//!
//! Per-article failures are isolated; the whole run fails only on empty
//! input or when nothing survives processing.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;

use crate::gateway::SharedGateway;
use crate::process::{ArticleProcessor, ProcessedArticle, RawArticle};
use crate::sink::{SharedSink, SinkLevel};

/// Fixed output schema, in column order.
pub const COLUMNS: [&str; 10] = [
    "title",
    "date",
    "tickers",
    "content",
    "provider",
    "url",
    "sentiment_score",
    "sentiment_description",
    "confidence",
    "processed_at",
];

const DATE_COLUMN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct BatchAggregator {
    processor: ArticleProcessor,
    sink: SharedSink,
}

impl BatchAggregator {
    pub fn new(gateway: SharedGateway, sink: SharedSink) -> Self {
        Self {
            processor: ArticleProcessor::new(gateway, sink.clone()),
            sink,
        }
    }

    /// Run the full batch. Articles are processed sequentially (the gateway
    /// is rate-governed); survivors keep encounter order until the final
    /// date sort.
    pub async fn run(&self, articles: &[RawArticle]) -> Result<OutputTable> {
        if articles.is_empty() {
            bail!("no articles to process");
        }

        let mut rows: Vec<ProcessedArticle> = Vec::with_capacity(articles.len());
        let mut rejected = 0usize;
        for raw in articles {
            match self.processor.process(raw).await {
                Some(row) => rows.push(row),
                None => rejected += 1,
            }
        }

        if rows.is_empty() {
            bail!("no articles survived processing ({rejected} rejected)");
        }
        if rejected > 0 {
            self.sink.emit(
                SinkLevel::Info,
                &format!("{rejected} of {} articles rejected", articles.len()),
            );
        }

        // Stable ascending sort; rows without a date go last.
        rows.sort_by(|a, b| compare_dates(&a.date, &b.date));

        Ok(OutputTable { rows })
    }
}

fn compare_dates(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The sorted result table. Owned by the aggregator's caller; written once.
#[derive(Debug)]
pub struct OutputTable {
    rows: Vec<ProcessedArticle>,
}

impl OutputTable {
    pub fn rows(&self) -> &[ProcessedArticle] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table as CSV with the fixed column order.
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&COLUMNS.join(","));
        out.push('\n');
        for row in &self.rows {
            let date = row
                .date
                .map(|d| d.format(DATE_COLUMN_FORMAT).to_string())
                .unwrap_or_default();
            let fields = [
                csv_field(&row.title),
                csv_field(&date),
                csv_field(&row.tickers),
                csv_field(&row.content),
                csv_field(&row.provider),
                csv_field(&row.url),
                row.sentiment_score.to_string(),
                csv_field(&row.sentiment_description),
                row.confidence.to_string(),
                csv_field(&row.processed_at),
            ];
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    /// Write the artifact atomically (tmp file + rename).
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("csv.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(self.to_csv_string().as_bytes())
            .context("writing csv artifact")?;
        fs::rename(&tmp, path)
            .with_context(|| format!("moving artifact into place at {}", path.display()))?;
        Ok(())
    }

    /// Observational statistics for the run report; not part of the
    /// artifact's correctness contract.
    pub fn summary(&self) -> BatchSummary {
        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut confidence_sum = 0.0f64;
        for row in &self.rows {
            *distribution
                .entry(row.sentiment_description.clone())
                .or_default() += 1;
            confidence_sum += row.confidence;
        }
        let mean_confidence = if self.rows.is_empty() {
            0.0
        } else {
            confidence_sum / self.rows.len() as f64
        };
        BatchSummary {
            rows: self.rows.len(),
            sentiment_distribution: distribution,
            mean_confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub rows: usize,
    pub sentiment_distribution: BTreeMap<String, usize>,
    pub mean_confidence: f64,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed {} articles", self.rows)?;
        writeln!(f, "Sentiment distribution:")?;
        for (label, count) in &self.sentiment_distribution {
            writeln!(f, "  {label}: {count}")?;
        }
        write!(f, "Average confidence: {:.2}", self.mean_confidence)
    }
}

/// RFC-4180-style field quoting: wrap when the field contains a comma,
/// quote, or line break; embedded quotes are doubled.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
        out
    } else {
        s.to_string()
    }
}
