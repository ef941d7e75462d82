// src/gateway.rs
//! Model gateway: provider abstraction for the generative-model call.
//! One prompt in, one free-text response out. No retries, no streaming; a
//! failed call surfaces as an error and the caller degrades to the neutral
//! fallback verdict.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;

/// Env escape hatch: force the deterministic mock regardless of config.
pub const ENV_TEST_MODE: &str = "GATEWAY_TEST_MODE";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Black-box model invocation boundary.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Shared handle used by callers.
pub type SharedGateway = Arc<dyn ModelGateway>;

/// Build the analysis prompt for one article text. The literal
/// REASONING/SCORE/CONFIDENCE contract at the end is load-bearing: the
/// interpreter scans for exactly these marker tokens.
pub fn analysis_prompt(text: &str) -> String {
    format!(
        "You are an expert financial analyst tasked with evaluating market \
sentiment. Analyze the following financial text and provide a sentiment \
score on a scale of 1 to 5:

Scoring Guide:
1 = Very Negative: Major problems, severe market distress, or significant losses
2 = Negative: Challenges, declining metrics, or concerning trends
3 = Neutral: Balanced news, mixed signals, or unclear direction
4 = Positive: Growth, opportunities, or improving conditions
5 = Very Positive: Exceptional performance, strong growth, or major breakthroughs

Consider:
- Financial metrics and performance indicators
- Market trends and future projections
- Expert opinions and analysis
- Broader market implications

Text to analyze:
{text}

Respond ONLY in this exact format:
REASONING: [2-3 sentences explaining the score]
SCORE: [single number 1-5]
CONFIDENCE: [High/Medium/Low]
"
    )
}

/// Factory: build a gateway according to config and environment.
///
/// * If `GATEWAY_TEST_MODE=mock`, returns the deterministic mock.
/// * `provider = "openai"` builds the real client (API key from config or
///   `OPENAI_API_KEY` when the config says `"ENV"`).
/// * `provider = "mock"` builds the mock explicitly.
pub fn build_gateway(config: &GatewayConfig) -> Result<SharedGateway> {
    if std::env::var(ENV_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockGateway::neutral()));
    }

    match config.provider.as_str() {
        "openai" => {
            let api_key = config.resolve_api_key()?;
            let gateway = OpenAiGateway::new(api_key, config.model.as_deref())?;
            Ok(Arc::new(gateway))
        }
        "mock" => Ok(Arc::new(MockGateway::neutral())),
        other => bail!("unsupported gateway provider: {other}"),
    }
}

/// OpenAI provider (Chat Completions API).
pub struct OpenAiGateway {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiGateway {
    /// `model_override`: pass Some("gpt-4o") to override; defaults to gpt-4o-mini.
    pub fn new(api_key: String, model_override: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("news-sentiment-pipeline/0.1 (+github.com/lumlich/news-sentiment-pipeline)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building http client")?;
        let model = model_override.unwrap_or(DEFAULT_MODEL).to_string();
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("missing API key for openai gateway");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        // The whole analysis prompt rides in the system slot; deterministic
        // sampling so identical inputs yield identical verdicts.
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "system",
                content: prompt,
            }],
            temperature: 0.0,
            max_tokens: 256,
        };

        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("gateway request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("gateway returned status {status}");
        }

        let body: Resp = resp.json().await.context("decoding gateway response")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            bail!("gateway returned an empty response");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic mock for tests and offline runs.
#[derive(Clone)]
pub struct MockGateway {
    response: String,
}

impl MockGateway {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }

    /// Canned well-formed neutral response.
    pub fn neutral() -> Self {
        Self::new(
            "REASONING: Mixed signals with no clear direction.\nSCORE: 3\nCONFIDENCE: Medium",
        )
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn invoke(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_text_and_contract_markers() {
        let p = analysis_prompt("Fed cuts rates");
        assert!(p.contains("Fed cuts rates"));
        assert!(p.contains("REASONING:"));
        assert!(p.contains("SCORE:"));
        assert!(p.contains("CONFIDENCE:"));
    }

    #[tokio::test]
    async fn mock_gateway_returns_fixed_response() {
        let gw = MockGateway::new("SCORE: 4");
        assert_eq!(gw.invoke("anything").await.unwrap(), "SCORE: 4");
        assert_eq!(gw.name(), "mock");
    }
}
