//! Headline sentiment
//!
//! Two capabilities: a `NewsSource` that turns a symbol into recent headline
//! strings, and a `SentimentAnalyzer` that turns headlines into a bounded
//! score. The analyzer backend is chosen once, explicitly, at construction:
//! a remote classification model, the built-in lexicon, or disabled. A
//! failing backend yields the neutral signal; it never switches backends on
//! its own.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Most headlines the analyzer will look at per call.
const MAX_HEADLINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentTone {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentTone::Positive => write!(f, "POSITIVE"),
            SentimentTone::Neutral => write!(f, "NEUTRAL"),
            SentimentTone::Negative => write!(f, "NEGATIVE"),
        }
    }
}

/// Bounded sentiment read: score in [-1, 1] plus how much to trust it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SentimentSignal {
    pub score: f64,
    pub summary: SentimentTone,
    pub confidence: f64,
}

impl SentimentSignal {
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            summary: SentimentTone::Neutral,
            confidence: 0.0,
        }
    }
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Recent headlines mentioning the symbol. Empty on failure.
    async fn fetch_headlines(&self, symbol: &str) -> Result<Vec<String>>;
}

/// newsapi.org client. Without an API key it serves deterministic
/// placeholder headlines so the rest of the pipeline stays exercisable.
pub struct NewsApiClient {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
}

impl NewsApiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn placeholder_headlines(symbol: &str) -> Vec<String> {
        vec![
            format!("{symbol} earnings report."),
            format!("Analysts upgrade {symbol}."),
            format!("{symbol} stock price volatility."),
            format!("{symbol} product launch."),
            format!("Regulatory news for {symbol}."),
        ]
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_headlines(&self, symbol: &str) -> Result<Vec<String>> {
        let Some(api_key) = &self.api_key else {
            debug!("no news API key, serving placeholder headlines");
            return Ok(Self::placeholder_headlines(symbol));
        };

        let from_date = (chrono::Utc::now() - chrono::Duration::days(2))
            .format("%Y-%m-%d")
            .to_string();

        let request = self
            .client
            .get("https://newsapi.org/v2/everything")
            .query(&[
                ("q", symbol),
                ("from", from_date.as_str()),
                ("sortBy", "relevancy"),
                ("language", "en"),
                ("apiKey", api_key.as_str()),
                ("pageSize", "20"),
            ]);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("headline fetch failed for {symbol}: {e}");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            warn!("news API returned {} for {symbol}", response.status());
            return Ok(Vec::new());
        }

        let body: NewsApiResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!("news API payload for {symbol} unreadable: {e}");
                return Ok(Vec::new());
            }
        };

        Ok(body
            .articles
            .into_iter()
            .filter_map(|a| a.title)
            .collect())
    }
}

/// How headline sentiment gets computed. Picked once from configuration.
#[derive(Debug, Clone)]
pub enum SentimentBackend {
    /// POST the headlines to a classification service (e.g. a hosted FinBERT)
    /// returning label/score pairs.
    Remote { endpoint: String },
    /// Built-in word-list polarity.
    Lexicon,
    /// Always neutral.
    Disabled,
}

#[derive(Debug, Deserialize)]
struct RemoteClassification {
    label: String,
    score: f64,
}

const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "bullish", "buy", "gain", "gains", "growth", "high", "jump", "jumps",
    "outperform", "positive", "profit", "profits", "rally", "record", "soar", "soars", "strong",
    "surge", "upgrade", "upgraded",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "crash", "cut", "cuts", "downgrade", "downgraded", "drop", "drops", "fall",
    "falls", "lawsuit", "loss", "losses", "low", "miss", "misses", "negative", "plunge",
    "plunges", "probe", "recall", "selloff", "warning", "warns", "weak",
];

pub struct SentimentAnalyzer {
    backend: SentimentBackend,
    client: reqwest::Client,
}

impl SentimentAnalyzer {
    pub fn new(backend: SentimentBackend) -> Self {
        Self {
            backend,
            client: reqwest::Client::new(),
        }
    }

    pub async fn analyze(&self, headlines: &[String]) -> SentimentSignal {
        if headlines.is_empty() {
            return SentimentSignal::neutral();
        }
        let headlines = &headlines[..headlines.len().min(MAX_HEADLINES)];

        match &self.backend {
            SentimentBackend::Disabled => SentimentSignal::neutral(),
            SentimentBackend::Lexicon => Self::analyze_lexicon(headlines),
            SentimentBackend::Remote { endpoint } => match self.analyze_remote(endpoint, headlines).await {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("remote sentiment failed, reporting neutral: {e}");
                    SentimentSignal::neutral()
                }
            },
        }
    }

    async fn analyze_remote(&self, endpoint: &str, headlines: &[String]) -> Result<SentimentSignal> {
        let response = self
            .client
            .post(endpoint)
            .json(&serde_json::json!({ "texts": headlines }))
            .send()
            .await?
            .error_for_status()?;

        let results: Vec<RemoteClassification> = response.json().await?;

        let mut total_score = 0.0;
        let mut total_conf = 0.0;
        for (i, result) in results.iter().enumerate() {
            // Headlines arrive relevance-sorted; earlier ones weigh more.
            let weight = 1.0 / (i as f64 + 1.0);
            let value = match result.label.to_lowercase().as_str() {
                "positive" => 1.0,
                "negative" => -1.0,
                _ => 0.0,
            };
            total_score += value * result.score * weight;
            total_conf += result.score * weight;
        }

        let avg = if total_conf > 0.0 {
            total_score / total_conf
        } else {
            0.0
        };

        let summary = if avg > 0.15 {
            SentimentTone::Positive
        } else if avg < -0.15 {
            SentimentTone::Negative
        } else {
            SentimentTone::Neutral
        };

        Ok(SentimentSignal {
            score: avg,
            summary,
            confidence: 1.0,
        })
    }

    fn analyze_lexicon(headlines: &[String]) -> SentimentSignal {
        let total: f64 = headlines.iter().map(|h| Self::polarity(h)).sum();
        let avg = total / headlines.len() as f64;

        let summary = if avg > 0.1 {
            SentimentTone::Positive
        } else if avg < -0.1 {
            SentimentTone::Negative
        } else {
            SentimentTone::Neutral
        };

        SentimentSignal {
            score: avg,
            summary,
            confidence: 0.5,
        }
    }

    /// Word-list polarity of one headline in [-1, 1].
    fn polarity(text: &str) -> f64 {
        let lower = text.to_lowercase();
        let mut positive = 0usize;
        let mut negative = 0usize;

        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            if POSITIVE_WORDS.binary_search(&word).is_ok() {
                positive += 1;
            } else if NEGATIVE_WORDS.binary_search(&word).is_ok() {
                negative += 1;
            }
        }

        let hits = positive + negative;
        if hits == 0 {
            0.0
        } else {
            (positive as f64 - negative as f64) / hits as f64
        }
    }
}
