// src/config.rs
//! Pipeline configuration. Loaded from TOML or JSON with an env path
//! override, falling back to defaults when no file exists:
//! 1) $PIPELINE_CONFIG_PATH
//! 2) config/pipeline.toml
//! 3) config/pipeline.json

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

fn default_input_dir() -> PathBuf {
    PathBuf::from("storage/datasets/default")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory scanned for `*.json` article records.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Directory the CSV artifact is written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            gateway: GatewayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// "openai" | "mock"
    pub provider: String,
    /// Provider model override; gateway default applies when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from OPENAI_API_KEY at build time.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_key: default_api_key(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the literal key, honoring the "ENV" indirection.
    pub fn resolve_api_key(&self) -> Result<String> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            return match self.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow!("Missing OPENAI_API_KEY env var")),
                other => bail!("provider {other} has no env-resolved key"),
            };
        }
        Ok(self.api_key.clone())
    }
}

impl PipelineConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())?;
        cfg.gateway.provider = cfg.gateway.provider.to_lowercase();
        Ok(cfg)
    }

    /// Env override first, then the well-known paths, then defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            bail!("PIPELINE_CONFIG_PATH points to non-existent path");
        }
        let toml_p = PathBuf::from("config/pipeline.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/pipeline.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<PipelineConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing JSON config");
    }
    // TOML is the default on-disk format.
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }
    serde_json::from_str(s).context("unsupported config format")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn toml_and_json_both_parse() {
        let toml_src = r#"
input_dir = "in"
output_dir = "out"

[gateway]
provider = "mock"
"#;
        let cfg = parse_config(toml_src, "toml").unwrap();
        assert_eq!(cfg.input_dir, PathBuf::from("in"));
        assert_eq!(cfg.gateway.provider, "mock");
        // missing api_key falls back to the ENV indirection
        assert_eq!(cfg.gateway.api_key, "ENV");

        let json_src = r#"{"gateway": {"provider": "openai", "model": "gpt-4o"}}"#;
        let cfg = parse_config(json_src, "json").unwrap();
        assert_eq!(cfg.input_dir, default_input_dir());
        assert_eq!(cfg.gateway.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn literal_api_key_is_passed_through() {
        let gw = GatewayConfig {
            provider: "openai".into(),
            model: None,
            api_key: "sk-test".into(),
        };
        assert_eq!(gw.resolve_api_key().unwrap(), "sk-test");
    }

    #[serial_test::serial]
    #[test]
    fn env_indirection_resolves_openai_key() {
        std::env::set_var("OPENAI_API_KEY", "sk-from-env");
        let gw = GatewayConfig::default();
        assert_eq!(gw.resolve_api_key().unwrap(), "sk-from-env");

        std::env::remove_var("OPENAI_API_KEY");
        assert!(gw.resolve_api_key().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_path_override_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pipeline.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "input_dir = \"elsewhere\"").unwrap();

        std::env::set_var(ENV_CONFIG_PATH, path.display().to_string());
        let cfg = PipelineConfig::load_default().unwrap();
        assert_eq!(cfg.input_dir, PathBuf::from("elsewhere"));
        std::env::remove_var(ENV_CONFIG_PATH);
    }
}
