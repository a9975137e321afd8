// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use vodovoz_app::{CatalogResponse, Product, STATUS_SUCCESS};

pub const DEFAULT_ENDPOINT: &str =
    "https://szorin.vodovoz.ru/newmobile/glavnaya/super_top.php?action=topglav";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://szorin.vodovoz.ru/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("catalog transport failed: {0}")]
    TransportFailed(String),
    #[error("catalog decode failed: {0}")]
    DecodeFailed(String),
    #[error("catalog rejected by server: {0}")]
    ServerRejected(String),
}

impl FetchError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TransportFailed(_) => "transport",
            Self::DecodeFailed(_) => "decode",
            Self::ServerRejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    endpoint: Url,
    image_base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl CatalogClient {
    pub fn new(endpoint: &str, image_base_url: &str, timeout: Duration) -> Result<Self> {
        let endpoint = parse_http_url("catalog.endpoint", endpoint)?;
        let base = parse_http_url("catalog.image_base_url", image_base_url)?;
        if !image_base_url.ends_with('/') {
            bail!(
                "catalog.image_base_url must end with '/' so picture paths append cleanly, got {base}"
            );
        }
        if timeout.is_zero() {
            bail!("catalog.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            endpoint,
            image_base_url: image_base_url.to_owned(),
            timeout,
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn image_base_url(&self) -> &str {
        &self.image_base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn image_url(&self, product: &Product) -> Option<Url> {
        product.image_url(&self.image_base_url)
    }

    /// Issues one GET against the configured endpoint. No retries.
    pub fn fetch(&self) -> Result<CatalogResponse, FetchError> {
        let started = Instant::now();
        debug!(endpoint = %self.endpoint, "fetching catalog");

        let result = self.fetch_once();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(catalog) => debug!(
                categories = catalog.categories.len(),
                products = catalog.product_count(),
                elapsed_ms,
                "catalog fetched"
            ),
            Err(error) => warn!(
                kind = error.kind(),
                %error,
                elapsed_ms,
                "catalog fetch failed"
            ),
        }
        result
    }

    /// Runs [`CatalogClient::fetch`] on a worker thread and hands the result
    /// to `deliver` there. `deliver` must route the value back to whoever
    /// owns the screen state and tolerate that owner being gone.
    pub fn spawn_fetch<F>(&self, deliver: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<CatalogResponse, FetchError>) + Send + 'static,
    {
        let client = self.clone();
        thread::spawn(move || deliver(client.fetch()))
    }

    fn fetch_once(&self) -> Result<CatalogResponse, FetchError> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .map_err(|error| connection_error(&self.endpoint, &error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(http_status_error(status, &body));
        }

        let body = response
            .bytes()
            .map_err(|error| FetchError::TransportFailed(format!("read response body: {error}")))?;
        decode_catalog(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: String,
}

/// Decodes a raw response body.
///
/// The envelope status is checked before the catalog itself so a rejection
/// without a `TOVARY` list still surfaces as `ServerRejected`.
pub fn decode_catalog(body: &[u8]) -> Result<CatalogResponse, FetchError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|error| FetchError::DecodeFailed(format!("malformed JSON: {error}")))?;

    let envelope = Envelope::deserialize(&value)
        .map_err(|error| FetchError::DecodeFailed(format!("envelope: {error}")))?;
    if envelope.status != STATUS_SUCCESS {
        let message = if envelope.message.trim().is_empty() {
            format!("status {:?}", envelope.status)
        } else {
            envelope.message
        };
        return Err(FetchError::ServerRejected(message));
    }

    let catalog: CatalogResponse = serde_json::from_value(value)
        .map_err(|error| FetchError::DecodeFailed(format!("catalog: {error}")))?;
    catalog
        .validate()
        .map_err(|violation| FetchError::DecodeFailed(format!("invalid catalog: {violation}")))?;
    Ok(catalog)
}

fn parse_http_url(field: &str, raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("{field} must not be empty");
    }
    let url = Url::parse(trimmed).with_context(|| format!("{field} is not a valid URL: {raw:?}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!(
            "{field} must use http or https, got scheme {other:?} in {raw:?}"
        )),
    }
}

fn connection_error(endpoint: &Url, error: &reqwest::Error) -> FetchError {
    let reason = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    FetchError::TransportFailed(format!("{reason} for {endpoint} ({error})"))
}

fn http_status_error(status: StatusCode, body: &str) -> FetchError {
    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return FetchError::TransportFailed(format!("HTTP {}: {body}", status.as_u16()));
    }
    FetchError::TransportFailed(format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::{
        CatalogClient, DEFAULT_ENDPOINT, DEFAULT_IMAGE_BASE_URL, DEFAULT_TIMEOUT, FetchError,
        decode_catalog, http_status_error,
    };
    use reqwest::StatusCode;
    use std::time::Duration;

    const MINIMAL: &str = r#"{
        "status": "Success",
        "message": "",
        "TOVARY": [
            {
                "ID": 17,
                "NAME": "Вода",
                "data": [
                    {
                        "ID": "1051",
                        "DETAIL_PICTURE": "upload/iblock/1051.png",
                        "PROPERTY_TSENA_ZA_EDINITSU_TOVARA_VALUE": 320,
                        "PROPERTY_RATING_VALUE": 4.9,
                        "CATALOG_QUANTITY": 40
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn minimal_payload_decodes_with_absent_optionals() -> anyhow::Result<()> {
        let catalog = decode_catalog(MINIMAL.as_bytes())?;
        assert_eq!(catalog.categories.len(), 1);
        let product = &catalog.categories[0].products[0];
        assert_eq!(product.id.as_str(), "1051");
        assert_eq!(product.name, None);
        assert_eq!(product.extended_price, None);
        assert_eq!(product.more_photo, None);
        assert_eq!(product.comment_count, None);
        Ok(())
    }

    #[test]
    fn non_success_status_is_server_rejected() {
        let body = MINIMAL.replace("\"Success\"", "\"Error\"").replace(
            "\"message\": \"\"",
            "\"message\": \"temporarily unavailable\"",
        );
        assert_eq!(
            decode_catalog(body.as_bytes()).expect_err("status Error must be rejected"),
            FetchError::ServerRejected("temporarily unavailable".to_owned())
        );
    }

    #[test]
    fn rejection_without_catalog_still_reports_server_rejected() {
        let error = decode_catalog(br#"{"status":"Fail"}"#).expect_err("should reject");
        assert_eq!(error, FetchError::ServerRejected("status \"Fail\"".to_owned()));
    }

    #[test]
    fn missing_product_id_is_decode_failure() {
        let body = MINIMAL.replace("\"ID\": \"1051\",", "");
        let error = decode_catalog(body.as_bytes()).expect_err("missing ID must fail");
        assert!(matches!(error, FetchError::DecodeFailed(_)));
        assert!(error.to_string().contains("ID"), "unexpected: {error}");
    }

    #[test]
    fn malformed_json_is_decode_failure() {
        let error = decode_catalog(b"<html>502</html>").expect_err("html must fail");
        let FetchError::DecodeFailed(detail) = &error else {
            panic!("expected decode failure, got {error:?}");
        };
        assert!(detail.starts_with("malformed JSON"), "detail: {detail}");
    }

    #[test]
    fn wrong_field_type_is_decode_failure() {
        let body = MINIMAL.replace("\"CATALOG_QUANTITY\": 40", "\"CATALOG_QUANTITY\": \"many\"");
        let error = decode_catalog(body.as_bytes()).expect_err("string quantity must fail");
        assert_eq!(error.kind(), "decode");
    }

    #[test]
    fn invariant_violation_is_decode_failure() {
        let body = MINIMAL.replace(
            "\"PROPERTY_TSENA_ZA_EDINITSU_TOVARA_VALUE\": 320",
            "\"PROPERTY_TSENA_ZA_EDINITSU_TOVARA_VALUE\": -1",
        );
        let error = decode_catalog(body.as_bytes()).expect_err("negative price must fail");
        assert!(error.to_string().contains("invalid catalog"));
    }

    #[test]
    fn http_status_error_keeps_short_plain_bodies() {
        assert_eq!(
            http_status_error(StatusCode::BAD_GATEWAY, "upstream down"),
            FetchError::TransportFailed("HTTP 502: upstream down".to_owned())
        );
        assert_eq!(
            http_status_error(StatusCode::NOT_FOUND, "{\"error\":\"x\"}"),
            FetchError::TransportFailed("HTTP 404".to_owned())
        );
    }

    #[test]
    fn new_rejects_bad_configuration() {
        let timeout = Duration::from_secs(1);
        let error = CatalogClient::new("", "https://a.example/", timeout)
            .expect_err("empty endpoint should fail");
        assert!(error.to_string().contains("must not be empty"));

        let error = CatalogClient::new("ftp://a.example/feed", "https://a.example/", timeout)
            .expect_err("ftp endpoint should fail");
        assert!(error.to_string().contains("http or https"));

        let error = CatalogClient::new("https://a.example/feed", "https://a.example", timeout)
            .expect_err("base without slash should fail");
        assert!(error.to_string().contains("must end with '/'"));

        let error =
            CatalogClient::new("https://a.example/feed", "https://a.example/", Duration::ZERO)
                .expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
    }

    #[test]
    fn defaults_point_at_vodovoz_backend() -> anyhow::Result<()> {
        let client = CatalogClient::new(DEFAULT_ENDPOINT, DEFAULT_IMAGE_BASE_URL, DEFAULT_TIMEOUT)?;
        assert!(client.endpoint().ends_with("super_top.php?action=topglav"));
        assert_eq!(client.image_base_url(), "https://szorin.vodovoz.ru/");
        Ok(())
    }
}
