// tests/interpret_contract.rs
// Contract tests for the response interpreter: well-formed scores parse,
// everything else degrades to the exact neutral fallback.

use news_sentiment_pipeline::interpret::{fallback, parse, FALLBACK_REASONING};
use news_sentiment_pipeline::rubric::{description_for, ConfidenceLevel};

#[test]
fn every_score_in_band_parses_with_its_rubric_entry() {
    for n in 1u8..=5 {
        let resp = format!("REASONING: because.\nSCORE: {n}\nCONFIDENCE: High");
        let out = parse(&resp);
        assert!(!out.is_fallback(), "score {n} should parse");
        let v = out.verdict();
        assert_eq!(v.score, n);
        assert_eq!(Some(v.description), description_for(n));
        assert_eq!(v.confidence, ConfidenceLevel::High);
    }
}

#[test]
fn missing_score_token_yields_exact_default_verdict() {
    let out = parse("A market commentary with no structure at all.");
    assert!(out.is_fallback());
    let v = out.verdict();
    assert_eq!(v.score, 3);
    assert_eq!(v.confidence.weight(), 0.5);
    assert_eq!(v.raw_response, None);
    assert_eq!(v.reasoning, FALLBACK_REASONING);
    assert_eq!(Some(v.description), description_for(3));
}

#[test]
fn out_of_band_score_yields_default_verdict() {
    for resp in ["SCORE: 0\nCONFIDENCE: High", "SCORE: 7", "SCORE: 9\nREASONING: x"] {
        let out = parse(resp);
        assert!(out.is_fallback(), "expected fallback for {resp:?}");
        assert_eq!(out.verdict().score, 3);
    }
}

#[test]
fn confidence_defaults_to_low_without_discarding_the_score() {
    let v = parse("REASONING: thin coverage.\nSCORE: 2").into_verdict();
    assert_eq!(v.score, 2);
    assert_eq!(v.confidence, ConfidenceLevel::Low);
    assert_eq!(v.confidence.weight(), 0.5);
}

#[test]
fn confidence_tokens_map_to_discrete_weights() {
    for (token, weight) in [("High", 0.9), ("Medium", 0.7), ("Low", 0.5)] {
        let resp = format!("SCORE: 4\nCONFIDENCE: {token}");
        assert_eq!(parse(&resp).verdict().confidence.weight(), weight);
    }
}

#[test]
fn repeated_parse_of_malformed_text_is_identical() {
    let text = "CONFIDENCE: High but the score line never arrived";
    let first = parse(text);
    for _ in 0..3 {
        assert_eq!(parse(text), first);
    }
    assert_eq!(first, fallback());
}
