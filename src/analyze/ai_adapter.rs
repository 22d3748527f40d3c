//! AI adapter: oracle abstraction + concrete providers + daily quota wrapper.
//!
//! The oracle is an opaque `generate(prompt) -> text` capability. It is fallible,
//! slow and non-deterministic; every component receives it as an injected
//! `Arc<dyn Oracle>` so tests can substitute a deterministic double.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Text-generation capability used by the analyzer, alert engine and trend job.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    /// One attempt, no retries. Any `Err` is treated as a hard failure by callers.
    async fn generate(&self, prompt: &str) -> Result<String>;
    /// Provider name for diagnostics/logs.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynOracle = Arc<dyn Oracle>;

/// Env switch for deterministic oracles: `mock` or `error`.
pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

/// Call the oracle once, bounded by `timeout`. Elapsed time counts as an error.
pub async fn generate_with_timeout(
    oracle: &dyn Oracle,
    prompt: &str,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, oracle.generate(prompt)).await {
        Ok(res) => res,
        Err(_) => Err(anyhow!(
            "oracle {} timed out after {}ms",
            oracle.name(),
            timeout.as_millis()
        )),
    }
}

/// Factory: build an oracle according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns the deterministic [`MockOracle`].
/// * If `AI_TEST_MODE=error`, returns an oracle that always fails.
/// * Else if `config.enabled == false`, returns [`DisabledOracle`].
/// * Else builds the real provider wrapped with the daily quota.
pub fn build_oracle(config: &AiConfig) -> DynOracle {
    match std::env::var(ENV_AI_TEST_MODE).ok().as_deref() {
        Some("mock") => return Arc::new(QuotaOracle::new(MockOracle, config.daily_limit)),
        Some("error") => return Arc::new(FailingOracle::new("AI_TEST_MODE=error")),
        _ => {}
    }

    if !config.enabled {
        return Arc::new(DisabledOracle);
    }

    match config.provider.as_str() {
        "openai" => match OpenAiOracle::new(&config.api_key, &config.model) {
            Ok(provider) => Arc::new(QuotaOracle::new(provider, config.daily_limit)),
            Err(e) => {
                tracing::warn!(error = ?e, "openai oracle unavailable, running disabled");
                Arc::new(DisabledOracle)
            }
        },
        other => {
            tracing::warn!(provider = other, "unsupported oracle provider, running disabled");
            Arc::new(DisabledOracle)
        }
    }
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

const SYSTEM_PROMPT: &str = "You are an expert marine and coastal hazard detection AI. \
Analyze text content to identify ocean-related hazards (tsunamis, high waves, marine life anomalies, \
pollution, oil spills, coastal erosion, unusual weather, debris), assess severity (low, medium, high, critical), \
extract locations, perform sentiment analysis and identify key phrases and trends. \
Support multiple languages (Hindi, English, Bengali, Tamil, etc.). \
When asked for JSON, respond with the JSON object only.";

/// OpenAI provider (Chat Completions API).
pub struct OpenAiOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("empty OpenAI API key");
        }
        let http = reqwest::Client::builder()
            .user_agent("ocean-hazard-sentinel/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct ChatMsg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    messages: Vec<ChatMsg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[async_trait::async_trait]
impl Oracle for OpenAiOracle {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let req = ChatReq {
            model: &self.model,
            messages: vec![
                ChatMsg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMsg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let body: ChatResp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?
            .error_for_status()
            .context("openai non-2xx")?
            .json()
            .await
            .context("openai response body")?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("openai response without content"))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails; used when AI is disabled so every caller takes its hard-failure path.
pub struct DisabledOracle;

#[async_trait::async_trait]
impl Oracle for DisabledOracle {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("oracle disabled"))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns the same reply for every prompt.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    pub reply: String,
}

impl FixedOracle {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait::async_trait]
impl Oracle for FixedOracle {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.reply.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Fails every call with the given reason.
#[derive(Debug, Clone)]
pub struct FailingOracle {
    reason: String,
}

impl FailingOracle {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl Oracle for FailingOracle {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("oracle failure: {}", self.reason))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Deterministic local oracle for `AI_TEST_MODE=mock`.
/// Answers JSON prompts with canned, conservative JSON and anything else with a short sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockOracle;

#[async_trait::async_trait]
impl Oracle for MockOracle {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let reply = if prompt.contains("\"trending_keywords\"") {
            serde_json::json!({
                "trending_keywords": ["waves", "oil spill"],
                "emerging_patterns": ["rising reports along the west coast"],
                "risk_assessment": "medium",
                "regional_hotspots": ["Goa"],
                "recommendations": ["Increase patrols on affected beaches"],
                "confidence_level": 0.6
            })
            .to_string()
        } else if prompt.contains("\"hazard_detected\"") {
            serde_json::json!({
                "hazard_detected": false,
                "hazard_types": [],
                "severity_prediction": null,
                "location_mentioned": null,
                "sentiment": "neutral",
                "sentiment_score": 0.0,
                "confidence_score": 0.5,
                "key_phrases": []
            })
            .to_string()
        } else {
            "Hazard reported nearby. Stay away from the shoreline and follow official guidance."
                .to_string()
        };
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Daily quota wrapper
// ------------------------------------------------------------

#[derive(Debug, Clone)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

impl DailyCounter {
    fn today() -> Self {
        Self {
            date: Utc::now().date_naive(),
            count: 0,
        }
    }
}

/// Caps real provider calls per UTC day. Exhausted quota is an error (hard failure).
pub struct QuotaOracle<O: Oracle> {
    inner: O,
    daily_limit: u32,
    counter: Mutex<DailyCounter>,
}

impl<O: Oracle> QuotaOracle<O> {
    pub fn new(inner: O, daily_limit: u32) -> Self {
        Self {
            inner,
            daily_limit,
            counter: Mutex::new(DailyCounter::today()),
        }
    }

    /// Reserve one call for today; `false` when the quota is spent.
    fn try_reserve(&self) -> bool {
        let mut g = match self.counter.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let today = Utc::now().date_naive();
        if g.date != today {
            *g = DailyCounter::today();
        }
        if g.count >= self.daily_limit {
            return false;
        }
        g.count = g.count.saturating_add(1);
        true
    }

    pub fn used_today(&self) -> u32 {
        match self.counter.lock() {
            Ok(g) => g.count,
            Err(poisoned) => poisoned.into_inner().count,
        }
    }
}

#[async_trait::async_trait]
impl<O: Oracle> Oracle for QuotaOracle<O> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if !self.try_reserve() {
            bail!(
                "daily oracle limit reached ({} calls via {})",
                self.daily_limit,
                self.inner.name()
            );
        }
        self.inner.generate(prompt).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// Single line, collapsed whitespace, surrounding quotes removed, at most `max_chars` chars.
pub fn sanitize_message(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars * 4));
    let mut prev_space = false;
    let mut n = 0usize;
    for ch in input.trim().trim_matches('"').chars() {
        if n >= max_chars {
            break;
        }
        if ch.is_whitespace() {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                n += 1;
            }
            prev_space = true;
        } else if !ch.is_control() {
            out.push(ch);
            prev_space = false;
            n += 1;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Never answers; exercises the timeout path.
    struct StalledOracle;

    #[async_trait::async_trait]
    impl Oracle for StalledOracle {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let res = generate_with_timeout(&StalledOracle, "x", Duration::from_millis(20)).await;
        let err = res.expect_err("stalled oracle must time out");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn quota_blocks_after_limit() {
        let q = QuotaOracle::new(FixedOracle::new("ok"), 2);
        assert!(q.generate("a").await.is_ok());
        assert!(q.generate("b").await.is_ok());
        assert!(q.generate("c").await.is_err());
        assert_eq!(q.used_today(), 2);
    }

    #[tokio::test]
    async fn disabled_and_failing_always_error() {
        assert!(DisabledOracle.generate("x").await.is_err());
        assert!(FailingOracle::new("boom").generate("x").await.is_err());
    }

    #[test]
    fn sanitize_collapses_and_caps() {
        let s = sanitize_message("  \"High  waves\n\tat Juhu.\"  ", 200);
        assert_eq!(s, "High waves at Juhu.");
        let long = "a".repeat(500);
        assert_eq!(sanitize_message(&long, 200).chars().count(), 200);
        assert_eq!(sanitize_message("समुद्र  तट", 200), "समुद्र तट");
    }
}
