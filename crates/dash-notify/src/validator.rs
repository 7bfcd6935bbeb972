//! Registration Validation
//!
//! Checks a webhook registration before anything is persisted. Rules are
//! applied in order and the first failure wins:
//!
//! 1. `url` and `event` must be present
//! 2. `event` must be one of the [`EventKind`] values
//! 3. `http://localhost:` urls need a 4-digit port followed by `/` (no network call)
//! 4. any other url must answer a liveness probe with 200
//! 5. `country` is normalised, falling back to the wildcard when unresolvable

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::event::EventKind;
use crate::subscription::WILDCARD_COUNTRY;

const LOCALHOST_PREFIX: &str = "http://localhost:";

/// Liveness check for non-loopback callback urls
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// HTTP status returned by the url
    async fn probe(&self, url: &str) -> anyhow::Result<u16>;
}

/// Resolves country codes against an external registry
#[async_trait]
pub trait CountryLookup: Send + Sync {
    async fn resolve(&self, code: &str) -> anyhow::Result<bool>;
}

/// GET based probe
pub struct HttpUrlProbe {
    client: Client,
}

impl HttpUrlProbe {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UrlProbe for HttpUrlProbe {
    async fn probe(&self, url: &str) -> anyhow::Result<u16> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

/// Lookup against a REST Countries compatible API (`{base}/alpha/{code}`)
pub struct RestCountriesLookup {
    client: Client,
    base_url: String,
}

impl RestCountriesLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CountryLookup for RestCountriesLookup {
    async fn resolve(&self, code: &str) -> anyhow::Result<bool> {
        let url = format!("{}/alpha/{}", self.base_url, code);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Ok(false),
            status => anyhow::bail!("country lookup returned {status}"),
        }
    }
}

/// Raw registration input, as decoded from a request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub country: String,
}

impl SubscriptionRequest {
    pub fn new(url: impl Into<String>, event: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event: event.into(),
            country: country.into(),
        }
    }
}

/// A request that passed validation, with its country normalised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubscription {
    pub url: String,
    pub event: EventKind,
    pub country: String,
}

pub struct SubscriptionValidator {
    probe: Arc<dyn UrlProbe>,
    countries: Arc<dyn CountryLookup>,
}

impl SubscriptionValidator {
    pub fn new(probe: Arc<dyn UrlProbe>, countries: Arc<dyn CountryLookup>) -> Self {
        Self { probe, countries }
    }

    pub async fn validate(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<ValidSubscription, ValidationError> {
        let url = request.url.as_str();

        if url.is_empty() {
            return Err(ValidationError::MissingField { field: "url" });
        }
        if request.event.is_empty() {
            return Err(ValidationError::MissingField { field: "event" });
        }

        // Exact match only, surrounding whitespace is not stripped
        let event: EventKind = request.event.parse()?;

        match url.strip_prefix(LOCALHOST_PREFIX) {
            Some(rest) => {
                if !is_valid_local_target(rest) {
                    return Err(ValidationError::InvalidLocalUrl { url: url.to_string() });
                }
            }
            None => self.check_reachable(url).await?,
        }

        let country = self.normalize_country(&request.country).await;

        Ok(ValidSubscription {
            url: url.to_string(),
            event,
            country,
        })
    }

    async fn check_reachable(&self, url: &str) -> Result<(), ValidationError> {
        match self.probe.probe(url).await {
            Ok(200) => {
                debug!(url = %url, "Callback url is reachable");
                Ok(())
            }
            Ok(status) => Err(ValidationError::UnreachableUrl {
                url: url.to_string(),
                reason: format!("responded with status {status}"),
            }),
            Err(e) => Err(ValidationError::UnreachableUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Unresolvable codes become the wildcard instead of rejecting the request.
    async fn normalize_country(&self, raw: &str) -> String {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return WILDCARD_COUNTRY.to_string();
        }

        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            warn!(country = %raw, "Country is not a two letter code, subscribing to all countries");
            return WILDCARD_COUNTRY.to_string();
        }

        match self.countries.resolve(&code).await {
            Ok(true) => code,
            Ok(false) => {
                warn!(country = %code, "Unknown country, subscribing to all countries");
                WILDCARD_COUNTRY.to_string()
            }
            Err(e) => {
                warn!(country = %code, error = %e, "Country lookup failed, subscribing to all countries");
                WILDCARD_COUNTRY.to_string()
            }
        }
    }
}

/// `rest` is the text after `http://localhost:`: four port digits then `/`.
fn is_valid_local_target(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 5 && bytes[..4].iter().all(u8::is_ascii_digit) && bytes[4] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingProbe {
        status: u16,
        calls: AtomicUsize,
    }

    impl CountingProbe {
        fn answering(status: u16) -> Arc<Self> {
            Arc::new(Self { status, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl UrlProbe for CountingProbe {
        async fn probe(&self, _url: &str) -> anyhow::Result<u16> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.status)
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl UrlProbe for FailingProbe {
        async fn probe(&self, _url: &str) -> anyhow::Result<u16> {
            anyhow::bail!("connection refused")
        }
    }

    struct KnownCountries {
        known: &'static [&'static str],
        calls: AtomicUsize,
    }

    impl KnownCountries {
        fn of(known: &'static [&'static str]) -> Arc<Self> {
            Arc::new(Self { known, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl CountryLookup for KnownCountries {
        async fn resolve(&self, code: &str) -> anyhow::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.known.contains(&code))
        }
    }

    struct BrokenCountries;

    #[async_trait]
    impl CountryLookup for BrokenCountries {
        async fn resolve(&self, _code: &str) -> anyhow::Result<bool> {
            anyhow::bail!("timeout")
        }
    }

    fn validator(probe: Arc<dyn UrlProbe>) -> SubscriptionValidator {
        SubscriptionValidator::new(probe, KnownCountries::of(&["NO", "SE"]))
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let v = validator(CountingProbe::answering(200));

        let err = v.validate(&SubscriptionRequest::new("", "REGISTER", "")).await.unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "url" });

        let err = v
            .validate(&SubscriptionRequest::new("http://localhost:8080/hook", "", ""))
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "event" });
    }

    #[tokio::test]
    async fn test_padded_events_are_rejected() {
        let v = validator(CountingProbe::answering(200));
        for event in [" REGISTER", "DELETE\n", "CHANGE ", "\tINVOKE", "   "] {
            let err = v
                .validate(&SubscriptionRequest::new("http://localhost:8080/hook", event, ""))
                .await
                .unwrap_err();
            assert_eq!(
                err,
                ValidationError::InvalidEvent { value: event.to_string() },
                "event {event:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_events_are_rejected() {
        let v = validator(CountingProbe::answering(200));
        for event in ["UPDATE", "register", "Invoke", "CREATE"] {
            let err = v
                .validate(&SubscriptionRequest::new("http://localhost:8080/hook", event, ""))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "INVALID_EVENT", "event {event}");
        }
    }

    #[tokio::test]
    async fn test_invalid_localhost_urls_never_probe() {
        let probe = CountingProbe::answering(200);
        let v = validator(probe.clone());

        for url in [
            "http://localhost:",
            "http://localhost:80/hook",
            "http://localhost:808/hook",
            "http://localhost:8080",
            "http://localhost:8080hook",
            "http://localhost:80a0/hook",
            "http://localhost:80800/hook",
        ] {
            let err = v
                .validate(&SubscriptionRequest::new(url, "CHANGE", ""))
                .await
                .unwrap_err();
            assert_eq!(err, ValidationError::InvalidLocalUrl { url: url.to_string() });
        }

        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_localhost_url_skips_probe() {
        let probe = CountingProbe::answering(500);
        let v = validator(probe.clone());

        let valid = v
            .validate(&SubscriptionRequest::new("http://localhost:8080/hook", "REGISTER", ""))
            .await
            .unwrap();
        assert_eq!(valid.event, EventKind::Register);
        assert_eq!(valid.url, "http://localhost:8080/hook");
        assert_eq!(valid.country, "");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);

        // The path may be empty as long as the separator is there
        assert!(v
            .validate(&SubscriptionRequest::new("http://localhost:3000/", "INVOKE", ""))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_remote_url_requires_200() {
        let ok = CountingProbe::answering(200);
        let v = validator(ok.clone());
        assert!(v
            .validate(&SubscriptionRequest::new("https://example.com/hook", "DELETE", ""))
            .await
            .is_ok());
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);

        for status in [201, 204, 301, 404, 500] {
            let v = validator(CountingProbe::answering(status));
            let err = v
                .validate(&SubscriptionRequest::new("https://example.com/hook", "DELETE", ""))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "UNREACHABLE_URL", "status {status}");
        }

        let v = validator(Arc::new(FailingProbe));
        let err = v
            .validate(&SubscriptionRequest::new("https://example.com/hook", "DELETE", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnreachableUrl { ref reason, .. } if reason.contains("refused")));
    }

    #[tokio::test]
    async fn test_country_normalisation() {
        let countries = KnownCountries::of(&["NO", "SE"]);
        let v = SubscriptionValidator::new(CountingProbe::answering(200), countries.clone());
        let url = "http://localhost:8080/hook";

        let cases = [
            ("no", "NO"),
            (" se ", "SE"),
            ("DK", ""),
            ("NOR", ""),
            ("N1", ""),
            ("", ""),
        ];
        for (raw, expected) in cases {
            let valid = v
                .validate(&SubscriptionRequest::new(url, "CHANGE", raw))
                .await
                .unwrap();
            assert_eq!(valid.country, expected, "country {raw:?}");
        }

        // Only well-formed codes reach the lookup
        assert_eq!(countries.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_country_lookup_error_falls_back_to_wildcard() {
        let v = SubscriptionValidator::new(CountingProbe::answering(200), Arc::new(BrokenCountries));
        let valid = v
            .validate(&SubscriptionRequest::new("http://localhost:8080/hook", "CHANGE", "NO"))
            .await
            .unwrap();
        assert_eq!(valid.country, "");
    }

    #[tokio::test]
    async fn test_event_checked_before_url() {
        let probe = CountingProbe::answering(200);
        let v = validator(probe.clone());
        let err = v
            .validate(&SubscriptionRequest::new("http://localhost:80/x", "NOPE", ""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_EVENT");
    }

    #[tokio::test]
    async fn test_http_probe_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alive"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let probe = HttpUrlProbe::new(Duration::from_secs(5)).unwrap();
        let status = probe.probe(&format!("{}/alive", server.uri())).await.unwrap();
        assert_eq!(status, 200);

        let status = probe.probe(&format!("{}/missing", server.uri())).await.unwrap();
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_rest_countries_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3.1/alpha/NO"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"cca2": "NO"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3.1/alpha/XX"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3.1/alpha/ZZ"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let lookup =
            RestCountriesLookup::new(format!("{}/v3.1/", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(lookup.resolve("NO").await.unwrap());
        assert!(!lookup.resolve("XX").await.unwrap());
        assert!(lookup.resolve("ZZ").await.is_err());
    }
}
