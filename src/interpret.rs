// src/interpret.rs
//! Turns a free-text model response into a typed sentiment verdict.
//!
//! The response contract is three line-prefixed fields:
//!
//! ```text
//! REASONING: <free text, may span lines>
//! SCORE: <digit 1-5>
//! CONFIDENCE: <High|Medium|Low>
//! ```
//!
//! Parsing is a small hand-written scanner over the marker tokens. It is a
//! total function: any malformed input yields the neutral fallback verdict,
//! never an error. Callers can tell the two apart through [`Interpretation`].

use once_cell::sync::Lazy;
use tracing::warn;

use crate::rubric::{description_for, ConfidenceLevel, NEUTRAL_DESCRIPTION, SCORE_MAX, SCORE_MIN};

const SCORE_MARKER: &str = "SCORE:";
const CONFIDENCE_MARKER: &str = "CONFIDENCE:";
const REASONING_MARKER: &str = "REASONING:";

/// Reasoning string carried by the fallback verdict.
pub const FALLBACK_REASONING: &str = "Default neutral sentiment due to processing error";

/// One interpreted model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Always within [1, 5].
    pub score: u8,
    /// Exact rubric entry for `score`.
    pub description: &'static str,
    pub confidence: ConfidenceLevel,
    /// Free-form model reasoning; may be empty.
    pub reasoning: String,
    /// Original response text; `None` on the fallback path.
    pub raw_response: Option<String>,
}

/// A verdict plus how it was obtained. `Fallback` marks the silent degrade
/// taken on malformed input, so callers no longer have to sniff
/// `raw_response == None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Parsed(Verdict),
    Fallback(Verdict),
}

impl Interpretation {
    pub fn verdict(&self) -> &Verdict {
        match self {
            Self::Parsed(v) | Self::Fallback(v) => v,
        }
    }

    pub fn into_verdict(self) -> Verdict {
        match self {
            Self::Parsed(v) | Self::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

static FALLBACK_VERDICT: Lazy<Verdict> = Lazy::new(|| Verdict {
    score: 3,
    description: NEUTRAL_DESCRIPTION,
    confidence: ConfidenceLevel::Low,
    reasoning: FALLBACK_REASONING.to_string(),
    raw_response: None,
});

/// The neutral degrade: score 3, Low confidence, no raw response.
/// Deterministic, so repeated calls on the same malformed input always
/// yield an identical verdict.
pub fn fallback() -> Interpretation {
    Interpretation::Fallback(FALLBACK_VERDICT.clone())
}

/// Parse one model response. Never fails; malformed input degrades to
/// [`fallback`].
pub fn parse(response: &str) -> Interpretation {
    let Some(score) = scan_score(response) else {
        warn!("could not extract sentiment score from response");
        return fallback();
    };
    if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        warn!(score, "score outside rubric band");
        return fallback();
    }
    let Some(description) = description_for(score) else {
        // unreachable after the band check, kept total
        return fallback();
    };

    // A missing confidence token does not discard a good score.
    let confidence = scan_confidence(response).unwrap_or(ConfidenceLevel::Low);
    let reasoning = scan_reasoning(response).unwrap_or_default();

    Interpretation::Parsed(Verdict {
        score,
        description,
        confidence,
        reasoning,
        raw_response: Some(response.to_string()),
    })
}

/// First digit following a `SCORE:` marker, skipping whitespace. Later
/// marker occurrences are tried when an earlier one has no digit.
fn scan_score(text: &str) -> Option<u8> {
    for (idx, _) in text.match_indices(SCORE_MARKER) {
        let rest = text[idx + SCORE_MARKER.len()..].trim_start();
        if let Some(d) = rest.chars().next().and_then(|c| c.to_digit(10)) {
            return Some(d as u8);
        }
    }
    None
}

/// First of High/Medium/Low following a `CONFIDENCE:` marker (exact casing).
fn scan_confidence(text: &str) -> Option<ConfidenceLevel> {
    for (idx, _) in text.match_indices(CONFIDENCE_MARKER) {
        let rest = text[idx + CONFIDENCE_MARKER.len()..].trim_start();
        for level in ConfidenceLevel::ALL {
            if rest.starts_with(level.label()) {
                return Some(level);
            }
        }
    }
    None
}

/// Everything after the first `REASONING:` marker through end of text,
/// trimmed. The contract puts reasoning first, so the trailing SCORE and
/// CONFIDENCE lines ride along; downstream treats this as opaque free text.
fn scan_reasoning(text: &str) -> Option<String> {
    text.find(REASONING_MARKER)
        .map(|idx| text[idx + REASONING_MARKER.len()..].trim().to_string())
}
