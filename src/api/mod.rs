//! Upstream API client.
//!
//! Defines the `Upstream` trait over the per-entity list endpoints and the
//! reqwest-backed `ApiFootballClient` implementation.
//!
//! Envelope shape: `{ "errors": [...], "response": [...] }`. A non-empty
//! `errors` field or a missing `response` field is a hard failure for the
//! call. A 429 triggers a fixed cool-down and one retry of the identical
//! request, bounded by the configured attempt count.
//!
//! Every HTTP attempt writes one `api_request_log` row; those writes are
//! independent of any batch transaction and their failures are swallowed.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::config::{ApiConfig, RetryConfig};
use crate::error::UpstreamError;
use crate::types::{
    CountryPayload, FixturePayload, LeaguePayload, StandingsPayload, TeamPayload,
};

/// Abstraction over the upstream sports API.
///
/// The sync layer consumes this trait rather than the concrete client so
/// tests can substitute canned responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn countries(&self) -> Result<Vec<CountryPayload>, UpstreamError>;

    async fn leagues<'a>(
        &self,
        season: Option<i64>,
        country: Option<&'a str>,
    ) -> Result<Vec<LeaguePayload>, UpstreamError>;

    async fn teams(&self, league: i64, season: i64) -> Result<Vec<TeamPayload>, UpstreamError>;

    async fn fixtures<'a>(
        &self,
        league: i64,
        season: i64,
        status: Option<&'a str>,
    ) -> Result<Vec<FixturePayload>, UpstreamError>;

    /// All fixtures currently in play (`live=all`).
    async fn live_fixtures(&self) -> Result<Vec<FixturePayload>, UpstreamError>;

    async fn standings(
        &self,
        league: i64,
        season: i64,
    ) -> Result<Vec<StandingsPayload>, UpstreamError>;
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct ApiEnvelope<T> {
    #[serde(default)]
    errors: serde_json::Value,
    #[serde(default)]
    response: Option<Vec<T>>,
}

/// The upstream reports errors as an empty array when there are none and as
/// a non-empty array or object when there are.
fn has_errors(errors: &serde_json::Value) -> bool {
    match errors {
        serde_json::Value::Null => false,
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(m) => !m.is_empty(),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Reqwest-backed client for the API-Sports football API.
pub struct ApiFootballClient {
    http: Client,
    base_url: String,
    retry: RetryConfig,
    /// Destination for `api_request_log` rows. Absent in unit tests.
    audit: Option<SqlitePool>,
}

impl ApiFootballClient {
    pub fn new(
        cfg: &ApiConfig,
        api_key: &str,
        retry: RetryConfig,
        audit: Option<SqlitePool>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key)
            .context("API key contains characters invalid in a header")?;
        key_value.set_sensitive(true);
        headers.insert("x-apisports-key", key_value);

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent("fixturesync/0.1.0")
            .default_headers(headers)
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            retry,
            audit,
        })
    }

    /// Fetch one endpoint and unwrap its envelope, retrying on 429.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, UpstreamError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!(endpoint, ?params, attempt, "Fetching upstream");
            let started = Instant::now();

            let resp = self.http.get(&url).query(params).send().await?;
            let status = resp.status();
            self.log_request(endpoint, params, status.as_u16(), started.elapsed())
                .await;

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == max_attempts {
                    break;
                }
                warn!(
                    endpoint,
                    attempt,
                    cooldown_secs = self.retry.cooldown_secs,
                    "Rate limit exceeded, waiting before retrying"
                );
                tokio::time::sleep(Duration::from_secs(self.retry.cooldown_secs)).await;
                continue;
            }

            if !status.is_success() {
                return Err(UpstreamError::Status(status));
            }

            let envelope: ApiEnvelope<T> = resp.json().await?;
            if has_errors(&envelope.errors) {
                return Err(UpstreamError::ApiErrors(envelope.errors.to_string()));
            }
            return envelope.response.ok_or(UpstreamError::MissingResponse);
        }

        Err(UpstreamError::RateLimitExhausted { attempts: max_attempts })
    }

    /// Record one HTTP attempt in the audit table. Failures are logged and
    /// swallowed; auditing must never take a sync down.
    async fn log_request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        status: u16,
        elapsed: Duration,
    ) {
        let Some(pool) = &self.audit else { return };

        let parameters = if params.is_empty() {
            None
        } else {
            let map: BTreeMap<&str, &str> =
                params.iter().map(|(k, v)| (*k, v.as_str())).collect();
            serde_json::to_string(&map).ok()
        };

        let result = sqlx::query(
            "INSERT INTO api_request_log (endpoint, parameters, response_status, response_time) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(endpoint)
        .bind(parameters)
        .bind(i64::from(status))
        .bind(elapsed.as_secs_f64())
        .execute(pool)
        .await;

        if let Err(e) = result {
            warn!(error = %e, endpoint, "Failed to record api_request_log row");
        }
    }
}

#[async_trait]
impl Upstream for ApiFootballClient {
    async fn countries(&self) -> Result<Vec<CountryPayload>, UpstreamError> {
        self.get("countries", &[]).await
    }

    async fn leagues<'a>(
        &self,
        season: Option<i64>,
        country: Option<&'a str>,
    ) -> Result<Vec<LeaguePayload>, UpstreamError> {
        let mut params = Vec::new();
        if let Some(season) = season {
            params.push(("season", season.to_string()));
        }
        if let Some(country) = country {
            params.push(("country", country.to_string()));
        }
        self.get("leagues", &params).await
    }

    async fn teams(&self, league: i64, season: i64) -> Result<Vec<TeamPayload>, UpstreamError> {
        let params = [("league", league.to_string()), ("season", season.to_string())];
        self.get("teams", &params).await
    }

    async fn fixtures<'a>(
        &self,
        league: i64,
        season: i64,
        status: Option<&'a str>,
    ) -> Result<Vec<FixturePayload>, UpstreamError> {
        let mut params = vec![("league", league.to_string()), ("season", season.to_string())];
        if let Some(status) = status {
            params.push(("status", status.to_string()));
        }
        self.get("fixtures", &params).await
    }

    async fn live_fixtures(&self) -> Result<Vec<FixturePayload>, UpstreamError> {
        self.get("fixtures", &[("live", "all".to_string())]).await
    }

    async fn standings(
        &self,
        league: i64,
        season: i64,
    ) -> Result<Vec<StandingsPayload>, UpstreamError> {
        let params = [("league", league.to_string()), ("season", season.to_string())];
        self.get("standings", &params).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
