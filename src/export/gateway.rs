//! HTTP client for the XML-to-DANFE conversion gateway.
//!
//! The gateway is a third party with an undocumented rate limit, so the
//! client carries an explicit timeout, a pacing delay used by the batch
//! builder, and a retry policy that defaults to zero retries.

use std::time::Duration;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header;
use serde::Deserialize;

use crate::export::error::ConvertError;

const DEFAULT_API_URL: &str = "https://api.meudanfe.com.br/v2/fd/convert/xml-to-da";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PACING_MS: u64 = 500;
const DATA_URI_PREFIX: &str = "data:application/pdf;base64,";

/// Minimum plausible length for an NF-e XML payload. Anything shorter is
/// rejected before a network call is made.
pub const MIN_XML_LEN: usize = 50;

/// Retry behavior for gateway requests. The portal's contract with the
/// gateway is "no automatic retries"; `RetryPolicy::none()` encodes that
/// explicitly while leaving room to turn on a bounded retry via config.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never zero.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn is_retryable(&self, status: reqwest::StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 502 | 503 | 504)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Minimum spacing between consecutive gateway requests within one
    /// batch. The upstream limit is undocumented; this figure is a tunable,
    /// not a verified contract.
    pub pacing: Duration,
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("MEUDANFE_API_KEY")
            .context("MEUDANFE_API_KEY must be set")?;
        let api_url = std::env::var("MEUDANFE_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let timeout = std::env::var("MEUDANFE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let pacing = std::env::var("MEUDANFE_PACING_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_PACING_MS));
        let retry = std::env::var("MEUDANFE_RETRY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|attempts| *attempts >= 1)
            .map(|max_attempts| RetryPolicy {
                max_attempts,
                backoff: Duration::from_secs(1),
            })
            .unwrap_or_else(RetryPolicy::none);

        Ok(Self {
            api_url,
            api_key,
            timeout,
            pacing,
            retry,
        })
    }
}

/// Accepted gateway response bodies. Anything that does not decode into one
/// of these variants is rejected as unrecognized rather than probed for
/// plausible fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GatewayResponse {
    Data { data: String },
    Pdf { pdf: String },
    Base64 { base64: String },
    Url { url: String },
}

/// True when the payload is long enough to plausibly be an NF-e document.
pub fn is_convertible_xml(xml_content: &str) -> bool {
    xml_content.trim().len() >= MIN_XML_LEN
}

#[derive(Clone)]
pub struct DanfeGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl DanfeGateway {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("carrier-portal-server/0.3")
            .build()
            .context("Failed to create HTTP client for the DANFE gateway")?;
        Ok(Self { client, config })
    }

    pub fn pacing(&self) -> Duration {
        self.config.pacing
    }

    /// Convert one XML payload into PDF bytes.
    ///
    /// Validation happens before any network activity; transport failures
    /// map to `Connectivity`, non-success statuses to `Gateway`, and
    /// unrecognized bodies to `UnrecognizedResponse`.
    pub async fn convert(&self, xml_content: &str) -> Result<Vec<u8>, ConvertError> {
        if !is_convertible_xml(xml_content) {
            return Err(ConvertError::InvalidXml);
        }
        let body = xml_content.trim().to_string();

        let mut attempt = 1;
        let response = loop {
            let response = self
                .client
                .post(&self.config.api_url)
                .header("Api-Key", &self.config.api_key)
                .header(header::ACCEPT, "application/json")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(body.clone())
                .send()
                .await
                .map_err(|e| ConvertError::Connectivity(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                break response;
            }
            if self.config.retry.is_retryable(status) && attempt < self.config.retry.max_attempts {
                log::warn!(
                    "Gateway returned {} (attempt {}/{}), retrying",
                    status,
                    attempt,
                    self.config.retry.max_attempts
                );
                attempt += 1;
                tokio::time::sleep(self.config.retry.backoff).await;
                continue;
            }
            return Err(gateway_error(response).await);
        };

        self.decode_response(response).await
    }

    async fn decode_response(&self, response: reqwest::Response) -> Result<Vec<u8>, ConvertError> {
        let is_pdf = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/pdf"))
            .unwrap_or(false);

        if is_pdf {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ConvertError::Connectivity(e.to_string()))?;
            return Ok(bytes.to_vec());
        }

        let text = response
            .text()
            .await
            .map_err(|e| ConvertError::Connectivity(e.to_string()))?;
        let parsed: GatewayResponse =
            serde_json::from_str(&text).map_err(|_| ConvertError::UnrecognizedResponse)?;

        match parsed {
            GatewayResponse::Data { data }
            | GatewayResponse::Pdf { pdf: data }
            | GatewayResponse::Base64 { base64: data } => {
                let encoded = data.strip_prefix(DATA_URI_PREFIX).unwrap_or(&data);
                STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| ConvertError::UnrecognizedResponse)
            }
            GatewayResponse::Url { url } => self.fetch_pdf(&url).await,
        }
    }

    /// Secondary fetch for responses that only carry a PDF location.
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>, ConvertError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ConvertError::Connectivity(e.to_string()))?;

        if !response.status().is_success() {
            return Err(gateway_error(response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ConvertError::Connectivity(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Build the diagnostic for a non-success response: prefer the JSON
/// `error`/`message` field, fall back to the body text, then to the
/// canonical status reason.
async fn gateway_error(response: reqwest::Response) -> ConvertError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    ConvertError::Gateway(format!("{} - {}", status.as_u16(), detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_url: String) -> GatewayConfig {
        GatewayConfig {
            api_url,
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            pacing: Duration::from_millis(0),
            retry: RetryPolicy::none(),
        }
    }

    fn valid_xml() -> String {
        format!("<nfeProc>{}</nfeProc>", "x".repeat(MIN_XML_LEN))
    }

    #[test]
    fn short_xml_is_not_convertible() {
        assert!(!is_convertible_xml(""));
        assert!(!is_convertible_xml("<nfe/>"));
        assert!(!is_convertible_xml(&" ".repeat(200)));
        assert!(is_convertible_xml(&"a".repeat(MIN_XML_LEN)));
    }

    #[tokio::test]
    async fn invalid_xml_never_reaches_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/convert")
            .expect(0)
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let result = gateway.convert("<short/>").await;

        assert!(matches!(result, Err(ConvertError::InvalidXml)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decodes_base64_payload_under_data_key() {
        let mut server = mockito::Server::new_async().await;
        let pdf = b"%PDF-1.4 fake";
        let body = serde_json::json!({ "data": STANDARD.encode(pdf) }).to_string();
        let mock = server
            .mock("POST", "/convert")
            .match_header("Api-Key", "test-key")
            .match_header("content-type", "text/plain")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let result = gateway.convert(&valid_xml()).await.unwrap();

        assert_eq!(result, pdf.to_vec());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn strips_data_uri_prefix_before_decoding() {
        let mut server = mockito::Server::new_async().await;
        let pdf = b"%PDF-1.4 prefixed";
        let body = serde_json::json!({
            "pdf": format!("data:application/pdf;base64,{}", STANDARD.encode(pdf))
        })
        .to_string();
        server
            .mock("POST", "/convert")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let result = gateway.convert(&valid_xml()).await.unwrap();
        assert_eq!(result, pdf.to_vec());
    }

    #[tokio::test]
    async fn accepts_direct_binary_pdf_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(&b"%PDF-1.7 binary"[..])
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let result = gateway.convert(&valid_xml()).await.unwrap();
        assert_eq!(result, b"%PDF-1.7 binary".to_vec());
    }

    #[tokio::test]
    async fn follows_url_variant_with_secondary_fetch() {
        let mut server = mockito::Server::new_async().await;
        let pdf_mock = server
            .mock("GET", "/files/danfe.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(&b"%PDF-1.5 remote"[..])
            .expect(1)
            .create_async()
            .await;
        let body = serde_json::json!({ "url": format!("{}/files/danfe.pdf", server.url()) })
            .to_string();
        server
            .mock("POST", "/convert")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let result = gateway.convert(&valid_xml()).await.unwrap();

        assert_eq!(result, b"%PDF-1.5 remote".to_vec());
        pdf_mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_json_shape_fails_closed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result": "ok", "document": "abc"}"#)
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let result = gateway.convert(&valid_xml()).await;
        assert!(matches!(result, Err(ConvertError::UnrecognizedResponse)));
    }

    #[tokio::test]
    async fn gateway_error_prefers_json_error_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "certificado expirado"}"#)
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let err = gateway.convert(&valid_xml()).await.unwrap_err();

        match err {
            ConvertError::Gateway(message) => {
                assert!(message.contains("422"));
                assert!(message.contains("certificado expirado"));
            }
            other => panic!("expected Gateway error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn gateway_error_falls_back_to_body_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert")
            .with_status(500)
            .with_body("internal failure")
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let err = gateway.convert(&valid_xml()).await.unwrap_err();
        match err {
            ConvertError::Gateway(message) => {
                assert!(message.contains("500 - internal failure"));
            }
            other => panic!("expected Gateway error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn zero_retry_policy_makes_exactly_one_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/convert")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let gateway =
            DanfeGateway::new(test_config(format!("{}/convert", server.url()))).unwrap();
        let result = gateway.convert(&valid_xml()).await;

        assert!(matches!(result, Err(ConvertError::Gateway(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bounded_retry_reattempts_throttled_requests() {
        let mut server = mockito::Server::new_async().await;
        let throttled = server
            .mock("POST", "/convert")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let mut config = test_config(format!("{}/convert", server.url()));
        config.retry = RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(10),
        };
        let gateway = DanfeGateway::new(config).unwrap();
        let err = gateway.convert(&valid_xml()).await.unwrap_err();

        match err {
            ConvertError::Gateway(message) => assert!(message.contains("429")),
            other => panic!("expected Gateway error, got {:?}", other),
        }
        throttled.assert_async().await;
    }

    #[tokio::test]
    async fn non_retryable_status_is_not_reattempted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/convert")
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let mut config = test_config(format!("{}/convert", server.url()));
        config.retry = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        };
        let gateway = DanfeGateway::new(config).unwrap();
        let result = gateway.convert(&valid_xml()).await;

        assert!(matches!(result, Err(ConvertError::Gateway(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_gateway_reports_connectivity() {
        // Port 1 is never listening locally.
        let gateway =
            DanfeGateway::new(test_config("http://127.0.0.1:1/convert".to_string())).unwrap();
        let result = gateway.convert(&valid_xml()).await;
        assert!(matches!(result, Err(ConvertError::Connectivity(_))));
    }
}
