//! Abstract fetching for PatentInsight.
//!
//! Given a record's source URL, the fetcher retrieves the page, extracts
//! title and abstract via an ordered selector cascade, and retries transient
//! failures with exponential backoff. Failures are encoded into the returned
//! [`AbstractResult`] rather than raised, so one bad record never aborts a
//! batch. Batch fetching is sequential with an inter-request throttle by
//! default; an optional bounded worker pool fetches concurrently but always
//! returns results in input order.

mod extract;
pub mod retry;

use std::sync::Arc;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use patentinsight_shared::{
    AbstractResult, FetchConfig, FetchErrorKind, PatentInsightError, Result, SearchRecord,
};

use crate::retry::{RetryPolicy, RetryState};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("PatentInsight/", env!("CARGO_PKG_VERSION"));

/// Body markers that indicate a rate-limit/CAPTCHA interstitial.
const BLOCKING_MARKERS: &[&str] = &["captcha", "unusual traffic"];

// ---------------------------------------------------------------------------
// AbstractFetcher
// ---------------------------------------------------------------------------

/// Fetches title + abstract for patent records with retry and throttling.
#[derive(Clone)]
pub struct AbstractFetcher {
    config: FetchConfig,
    client: Client,
}

impl AbstractFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PatentInsightError::config(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    /// Fetch one record's abstract. Never fails at the signature level:
    /// the outcome, success or terminal failure, is the returned result.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn fetch(&self, id: &str, url: &str) -> AbstractResult {
        let parsed = match validate_source_url(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url, error = %e, "invalid source URL, skipping fetch");
                return failure(id, url, FetchErrorKind::InvalidUrl, e.to_string(), 0);
            }
        };

        let policy = RetryPolicy::new(self.config.max_retries, self.config.base_backoff);
        let mut state = policy.start();
        let mut last_failure: Option<(FetchErrorKind, String, u32)> = None;

        loop {
            match state {
                RetryState::Attempt(attempt) => match self.attempt(&parsed).await {
                    Ok(page) => {
                        if page.abstract_text.is_none() {
                            warn!(url = %parsed, "no abstract selector matched");
                        }
                        if page.title.is_none() {
                            warn!(url = %parsed, "no title selector matched");
                        }
                        return AbstractResult {
                            id: id.to_string(),
                            title: page.title,
                            abstract_text: page.abstract_text,
                            url: parsed.to_string(),
                            error: None,
                            error_message: None,
                            retry_count: attempt - 1,
                            fetched_at: Utc::now(),
                        };
                    }
                    Err(e) => {
                        let kind = e.fetch_kind().unwrap_or(FetchErrorKind::NetworkError);
                        debug!(attempt, error = %e, "fetch attempt failed");
                        last_failure = Some((kind, e.to_string(), attempt));
                        state = policy.after_failure(attempt, kind);
                    }
                },
                RetryState::Backoff {
                    next_attempt,
                    delay,
                } => {
                    debug!(next_attempt, delay_ms = delay.as_millis() as u64, "backing off");
                    tokio::time::sleep(delay).await;
                    state = RetryState::Attempt(next_attempt);
                }
                RetryState::GiveUp => {
                    let (kind, message, attempts) = last_failure
                        .unwrap_or((FetchErrorKind::NetworkError, "no attempt made".into(), 1));
                    warn!(%kind, attempts, "giving up on record");
                    return failure(id, url, kind, message, attempts - 1);
                }
            }
        }
    }

    /// Fetch a batch of records, returning one result per record in input
    /// order regardless of fetch concurrency.
    ///
    /// With `stop_on_error` set (sequential mode only), the batch stops at
    /// the first terminal failure and the returned vector is truncated to
    /// what was attempted; the pooled mode drains its in-flight work first.
    #[instrument(skip_all, fields(records = records.len(), concurrency = self.config.concurrency))]
    pub async fn fetch_batch(
        &self,
        records: &[SearchRecord],
        stop_on_error: bool,
    ) -> Vec<AbstractResult> {
        info!(
            records = records.len(),
            concurrency = self.config.concurrency,
            "starting abstract fetch"
        );

        if self.config.concurrency <= 1 {
            self.fetch_sequential(records, stop_on_error).await
        } else {
            self.fetch_pooled(records).await
        }
    }

    async fn fetch_sequential(
        &self,
        records: &[SearchRecord],
        stop_on_error: bool,
    ) -> Vec<AbstractResult> {
        let mut results = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            if i > 0 && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }

            let result = self.fetch(&record.id, &record.result_link).await;
            let failed = !result.is_success();
            results.push(result);

            if stop_on_error && failed {
                warn!(id = %record.id, "stopping batch at first failure");
                break;
            }
        }

        results
    }

    async fn fetch_pooled(&self, records: &[SearchRecord]) -> Vec<AbstractResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut handles = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            let fetcher = self.clone();
            let sem = semaphore.clone();
            let id = record.id.clone();
            let url = record.result_link.clone();
            let delay = self.config.request_delay;

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                (i, fetcher.fetch(&id, &url).await)
            }));
        }

        // Completion order is not guaranteed; slot results back by index so
        // unordered fetches never leak downstream.
        let mut slots: Vec<Option<AbstractResult>> = records.iter().map(|_| None).collect();
        for handle in handles {
            match handle.await {
                Ok((i, result)) => slots[i] = Some(result),
                Err(e) => warn!(error = %e, "fetch task failed"),
            }
        }

        records
            .iter()
            .zip(slots)
            .map(|(record, slot)| {
                slot.unwrap_or_else(|| {
                    failure(
                        &record.id,
                        &record.result_link,
                        FetchErrorKind::NetworkError,
                        "fetch task failed".into(),
                        0,
                    )
                })
            })
            .collect()
    }

    /// One network attempt: request, status triage, blocking detection,
    /// selector extraction.
    async fn attempt(&self, url: &Url) -> Result<extract::ExtractedPage> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PatentInsightError::Network(format!("{url}: request timed out"))
                } else {
                    PatentInsightError::Network(format!("{url}: {e}"))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(PatentInsightError::Blocked(format!("{url}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(PatentInsightError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PatentInsightError::Network(format!("{url}: body read failed: {e}")))?;

        if is_blocking_page(&body) {
            return Err(PatentInsightError::Blocked(format!(
                "{url}: blocking interstitial detected"
            )));
        }

        extract::extract_page(&body)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse and check a source URL before any network traffic.
fn validate_source_url(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| PatentInsightError::InvalidUrl(format!("{url}: {e}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(PatentInsightError::InvalidUrl(format!(
            "{url}: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(parsed)
}

/// Whether the body looks like a rate-limit/CAPTCHA interstitial.
fn is_blocking_page(body: &str) -> bool {
    let lower = body.to_lowercase();
    BLOCKING_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn failure(
    id: &str,
    url: &str,
    kind: FetchErrorKind,
    message: String,
    retry_count: u32,
) -> AbstractResult {
    AbstractResult {
        id: id.to_string(),
        title: None,
        abstract_text: None,
        url: url.to_string(),
        error: Some(kind),
        error_message: Some(message),
        retry_count,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod fetcher_tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(max_retries: u32, concurrency: usize) -> FetchConfig {
        FetchConfig {
            request_delay: Duration::ZERO,
            max_retries,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            concurrency,
        }
    }

    fn record(id: &str, url: String) -> SearchRecord {
        SearchRecord {
            id: id.into(),
            title: format!("{id} title"),
            assignee: "Acme Corp".into(),
            inventors: "A. Inventor".into(),
            priority_date: "2015-01-01".into(),
            filing_date: "2015-06-01".into(),
            publication_date: "2016-02-01".into(),
            grant_date: "2016-02-02".into(),
            result_link: url,
            figure_link: None,
        }
    }

    const PATENT_PAGE: &str = r#"<html><body>
        <span itemprop="title">Vagus nerve stimulation device</span>
        <div itemprop="abstract">A device for stimulation and monitoring of the vagus nerve.</div>
    </body></html>"#;

    #[tokio::test]
    async fn fetch_extracts_title_and_abstract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patent/US-1-A/en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PATENT_PAGE))
            .mount(&server)
            .await;

        let fetcher = AbstractFetcher::new(test_config(3, 1)).unwrap();
        let result = fetcher
            .fetch("US-1-A", &format!("{}/patent/US-1-A/en", server.uri()))
            .await;

        assert!(result.is_success());
        assert_eq!(
            result.title.as_deref(),
            Some("Vagus nerve stimulation device")
        );
        assert!(result.abstract_text.as_deref().unwrap().contains("monitoring"));
        assert_eq!(result.retry_count, 0);
    }

    #[tokio::test]
    async fn missing_abstract_is_partial_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><h1>Title only</h1></body></html>"),
            )
            .mount(&server)
            .await;

        let fetcher = AbstractFetcher::new(test_config(0, 1)).unwrap();
        let result = fetcher.fetch("US-1-A", &server.uri()).await;

        assert!(result.is_success());
        assert_eq!(result.title.as_deref(), Some("Title only"));
        assert!(result.abstract_text.is_none());
    }

    #[tokio::test]
    async fn invalid_url_fails_without_network_call() {
        let fetcher = AbstractFetcher::new(test_config(3, 1)).unwrap();
        let result = fetcher.fetch("US-1-A", "not a url").await;

        assert_eq!(result.error, Some(FetchErrorKind::InvalidUrl));
        assert_eq!(result.retry_count, 0);

        let result = fetcher.fetch("US-1-A", "ftp://example.com/patent").await;
        assert_eq!(result.error, Some(FetchErrorKind::InvalidUrl));
    }

    #[tokio::test]
    async fn transient_failure_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PATENT_PAGE))
            .mount(&server)
            .await;

        let fetcher = AbstractFetcher::new(test_config(3, 1)).unwrap();
        let result = fetcher.fetch("US-1-A", &server.uri()).await;

        assert!(result.is_success());
        assert_eq!(result.retry_count, 2);
    }

    #[tokio::test]
    async fn retries_exhausted_is_terminal_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = AbstractFetcher::new(test_config(2, 1)).unwrap();
        let result = fetcher.fetch("US-1-A", &server.uri()).await;

        assert_eq!(result.error, Some(FetchErrorKind::NetworkError));
        assert_eq!(result.retry_count, 2);
        assert!(result.error_message.as_deref().unwrap().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn rate_limit_status_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let fetcher = AbstractFetcher::new(test_config(1, 1)).unwrap();
        let result = fetcher.fetch("US-1-A", &server.uri()).await;

        assert_eq!(result.error, Some(FetchErrorKind::Blocked));
        assert_eq!(result.retry_count, 1);
    }

    #[tokio::test]
    async fn captcha_body_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body>Please solve this CAPTCHA to continue</body></html>",
            ))
            .mount(&server)
            .await;

        let fetcher = AbstractFetcher::new(test_config(0, 1)).unwrap();
        let result = fetcher.fetch("US-1-A", &server.uri()).await;

        assert_eq!(result.error, Some(FetchErrorKind::Blocked));
    }

    #[tokio::test]
    async fn unparseable_page_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body><p>nope</p></body></html>"),
            )
            .mount(&server)
            .await;

        let fetcher = AbstractFetcher::new(test_config(0, 1)).unwrap();
        let result = fetcher.fetch("US-1-A", &server.uri()).await;

        assert_eq!(result.error, Some(FetchErrorKind::ParseError));
    }

    #[tokio::test]
    async fn batch_preserves_input_order_with_worker_pool() {
        let server = MockServer::start().await;
        for (route, delay_ms) in [("/a", 80u64), ("/b", 10), ("/c", 40)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(PATENT_PAGE)
                        .set_delay(Duration::from_millis(delay_ms)),
                )
                .mount(&server)
                .await;
        }

        let records = vec![
            record("US-1-A", format!("{}/a", server.uri())),
            record("US-2-B", format!("{}/b", server.uri())),
            record("US-3-C", format!("{}/c", server.uri())),
        ];

        let fetcher = AbstractFetcher::new(test_config(0, 3)).unwrap();
        let results = fetcher.fetch_batch(&records, false).await;

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["US-1-A", "US-2-B", "US-3-C"]);
        assert!(results.iter().all(AbstractResult::is_success));
    }

    #[tokio::test]
    async fn sequential_batch_stops_on_first_error_when_asked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/good"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PATENT_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let records = vec![
            record("US-1-A", format!("{}/good", server.uri())),
            record("US-2-B", format!("{}/bad", server.uri())),
            record("US-3-C", format!("{}/good", server.uri())),
        ];

        let fetcher = AbstractFetcher::new(test_config(0, 1)).unwrap();
        let results = fetcher.fetch_batch(&records, true).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
    }
}
