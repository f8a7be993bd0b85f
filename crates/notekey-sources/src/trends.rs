//! Google Trends candidate source.
//!
//! A lookup is two requests against the unofficial web API:
//!
//! 1. `POST /trends/api/explore` returns the widgets for a keyword. The
//!    `RELATED_TOPICS` widget carries a `token` and a `request` object.
//! 2. `GET /trends/api/widgetdata/relatedsearches` with that token returns
//!    the ranked lists. Index 0 is "top", index 1 is "rising".
//!
//! Both bodies start with the anti-XSSI prefix `)]}'` which is stripped
//! before JSON parsing. Region, locale and time window are fixed per client.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use notekey_core::defaults;
use notekey_core::{Candidate, Error, Result, TrendSource};

const EXPLORE_PATH: &str = "/trends/api/explore";
const RELATED_SEARCHES_PATH: &str = "/trends/api/widgetdata/relatedsearches";
const RELATED_TOPICS_WIDGET: &str = "RELATED_TOPICS";

/// Trend service configuration. Constant for the life of a client.
#[derive(Debug, Clone)]
pub struct TrendsConfig {
    /// Service base URL (no trailing slash).
    pub base_url: String,
    /// Host language.
    pub hl: String,
    /// Timezone offset in minutes.
    pub tz: i32,
    /// Region code.
    pub geo: String,
    /// Historical window, e.g. `today 5-y`.
    pub timeframe: String,
    /// Category id, 0 for all.
    pub category: i32,
    /// Bound on the whole lookup.
    pub timeout: Duration,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::TRENDS_URL.to_string(),
            hl: defaults::TRENDS_HL.to_string(),
            tz: defaults::TRENDS_TZ,
            geo: defaults::TRENDS_GEO.to_string(),
            timeframe: defaults::TRENDS_TIMEFRAME.to_string(),
            category: defaults::TRENDS_CATEGORY,
            timeout: Duration::from_secs(defaults::TRENDS_TIMEOUT_SECS),
        }
    }
}

impl TrendsConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            base_url: std::env::var("NOTEKEY_TRENDS_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(base.base_url),
            hl: std::env::var("NOTEKEY_TRENDS_HL").unwrap_or(base.hl),
            tz: std::env::var("NOTEKEY_TRENDS_TZ")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.tz),
            geo: std::env::var("NOTEKEY_TRENDS_GEO").unwrap_or(base.geo),
            timeframe: std::env::var("NOTEKEY_TRENDS_TIMEFRAME").unwrap_or(base.timeframe),
            category: std::env::var("NOTEKEY_TRENDS_CATEGORY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.category),
            timeout: std::env::var("NOTEKEY_TRENDS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(base.timeout),
        }
    }

    /// Point the client at a different service root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A topic entity as reported by the trend service.
#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    #[serde(default)]
    pub mid: Option<String>,
    pub title: String,
    #[serde(rename = "type", default)]
    pub topic_type: String,
}

/// One entry of a ranked list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedKeyword {
    pub topic: Topic,
    /// Relevance, 0-100 for the top list.
    pub value: f64,
    #[serde(default)]
    pub formatted_value: Option<String>,
}

/// Related topics for one keyword.
#[derive(Debug, Clone, Default)]
pub struct RelatedTopics {
    pub top: Vec<RankedKeyword>,
    pub rising: Vec<RankedKeyword>,
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    widgets: Vec<Widget>,
}

#[derive(Debug, Clone, Deserialize)]
struct Widget {
    id: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    request: JsonValue,
}

#[derive(Debug, Deserialize)]
struct WidgetDataResponse {
    default: RankedLists,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankedLists {
    #[serde(default)]
    ranked_list: Vec<RankedList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankedList {
    #[serde(default)]
    ranked_keyword: Vec<RankedKeyword>,
}

/// Client for the Google Trends related-topics API.
pub struct TrendsClient {
    client: Client,
    config: TrendsConfig,
    cookies: OnceCell<()>,
}

impl TrendsClient {
    /// Create a client with the given configuration.
    pub fn new(config: TrendsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "sources",
            component = "trends",
            base_url = %config.base_url,
            geo = %config.geo,
            hl = %config.hl,
            timeframe = %config.timeframe,
            timeout_ms = config.timeout.as_millis() as u64,
            "Initializing trend client"
        );

        Ok(Self {
            client,
            config,
            cookies: OnceCell::new(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(TrendsConfig::from_env())
    }

    pub fn config(&self) -> &TrendsConfig {
        &self.config
    }

    /// Fetch the top and rising related topics for a keyword.
    ///
    /// The whole exchange is bounded by the configured timeout. No retries.
    pub async fn related_topics(&self, keyword: &str) -> Result<RelatedTopics> {
        match tokio::time::timeout(self.config.timeout, self.related_topics_inner(keyword)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::ExternalService(format!(
                "Trend lookup timed out after {}ms",
                self.config.timeout.as_millis()
            ))),
        }
    }

    async fn related_topics_inner(&self, keyword: &str) -> Result<RelatedTopics> {
        self.cookies.get_or_init(|| self.warm_up_cookies()).await;

        let widget = self.explore(keyword).await?;
        self.widget_data(&widget).await
    }

    /// The service rejects cookieless clients more often; fetch the region
    /// landing page once so the cookie store is populated.
    async fn warm_up_cookies(&self) {
        let result = self
            .client
            .get(format!("{}/", self.config.base_url))
            .query(&[("geo", self.config.geo.as_str())])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => debug!("Trend cookies acquired"),
            Ok(resp) => warn!(status = %resp.status(), "Trend cookie warm-up rejected"),
            Err(e) => warn!(error = %e, "Trend cookie warm-up failed"),
        }
    }

    async fn explore(&self, keyword: &str) -> Result<Widget> {
        let req = serde_json::json!({
            "comparisonItem": [{
                "keyword": keyword,
                "time": self.config.timeframe,
                "geo": self.config.geo,
            }],
            "category": self.config.category,
            "property": "",
        });
        let tz = self.config.tz.to_string();
        let req = req.to_string();

        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, EXPLORE_PATH))
            .query(&[
                ("hl", self.config.hl.as_str()),
                ("tz", tz.as_str()),
                ("req", req.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Explore request failed: {}", e)))?;

        let body = read_body(response, "explore").await?;
        let explore: ExploreResponse = serde_json::from_str(strip_xssi_prefix(&body))
            .map_err(|e| Error::ExternalService(format!("Malformed explore response: {}", e)))?;

        explore
            .widgets
            .into_iter()
            .find(|w| w.id.contains(RELATED_TOPICS_WIDGET))
            .ok_or_else(|| {
                Error::ExternalService(format!("No related topics widget for '{}'", keyword))
            })
    }

    async fn widget_data(&self, widget: &Widget) -> Result<RelatedTopics> {
        let tz = self.config.tz.to_string();
        let req = widget.request.to_string();

        let response = self
            .client
            .get(format!("{}{}", self.config.base_url, RELATED_SEARCHES_PATH))
            .query(&[
                ("hl", self.config.hl.as_str()),
                ("tz", tz.as_str()),
                ("req", req.as_str()),
                ("token", widget.token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Widget request failed: {}", e)))?;

        let body = read_body(response, "widget data").await?;
        let data: WidgetDataResponse = serde_json::from_str(strip_xssi_prefix(&body))
            .map_err(|e| Error::ExternalService(format!("Malformed widget response: {}", e)))?;

        let mut lists = data.default.ranked_list.into_iter();
        let top = lists.next().map(|l| l.ranked_keyword).unwrap_or_default();
        let rising = lists.next().map(|l| l.ranked_keyword).unwrap_or_default();

        Ok(RelatedTopics { top, rising })
    }
}

#[async_trait]
impl TrendSource for TrendsClient {
    #[instrument(skip(self), fields(subsystem = "sources", component = "trends", op = "fetch_trend_candidates"))]
    async fn fetch_trend_candidates(&self, keyword: &str) -> Result<Vec<Candidate>> {
        let start = Instant::now();
        let topics = self.related_topics(keyword).await?;
        let candidates = top_topics_to_candidates(&topics.top);

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            top_count = topics.top.len(),
            rising_count = topics.rising.len(),
            candidate_count = candidates.len(),
            duration_ms = elapsed,
            "Trend lookup complete"
        );
        if elapsed > defaults::TRENDS_SLOW_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow trend lookup");
        }

        if candidates.is_empty() {
            return Err(Error::ExternalService(format!(
                "Trend service returned no related topics for '{}'",
                keyword
            )));
        }
        Ok(candidates)
    }
}

/// Convert the "top" list into candidates. Titles repeat occasionally; the
/// first position wins. Zero-valued topics cannot be sampled and are dropped.
fn top_topics_to_candidates(top: &[RankedKeyword]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    top.iter()
        .filter(|entry| seen.insert(entry.topic.title.as_str()))
        .map(|entry| Candidate::new(entry.topic.title.clone(), entry.value))
        .filter(Candidate::has_positive_score)
        .collect()
}

async fn read_body(response: reqwest::Response, what: &str) -> Result<String> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::ExternalService(format!(
            "Trend service rate limited the {} request (429)",
            what
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::ExternalService(format!(
            "Trend service returned {} for {} request: {}",
            status, what, body
        )));
    }
    response
        .text()
        .await
        .map_err(|e| Error::ExternalService(format!("Failed to read {} body: {}", what, e)))
}

/// Drop the `)]}'` / `)]}',` guard in front of the JSON document.
fn strip_xssi_prefix(body: &str) -> &str {
    match body.find(|c| c == '{' || c == '[') {
        Some(start) => &body[start..],
        None => body,
    }
}
