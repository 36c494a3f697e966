use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::client::{IntakeBackend, TermsSource};
use crate::errors::AppError;
use crate::models::{IntakeRequest, IntakeResponse, TermsResponse};

/// Default address of the intake service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Plain-HTTP JSON client for the external intake service
/// (`POST /chat`, `POST /verify`, `GET /terms`).
#[derive(Clone)]
pub struct HttpIntakeClient {
    client: Client,
    base_url: String,
}

impl HttpIntakeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl IntakeBackend for HttpIntakeClient {
    async fn exchange(&self, request: &IntakeRequest) -> Result<IntakeResponse, AppError> {
        let url = self.url(request.endpoint().path());
        debug!(%url, "dispatching intake request");

        let resp = self
            .client
            .post(&url)
            .json(&request.payload())
            .send()
            .await
            .map_err(|e| {
                error!("Intake request to {url} failed: {e}");
                AppError::from(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            error!("Intake service at {url} answered {status}");
            return Err(AppError::HttpStatus { status: status.as_u16() });
        }

        let body = resp.text().await?;
        IntakeResponse::from_body(&body).map_err(|e| {
            error!("Intake service at {url} sent an unusable body: {e:?}");
            e
        })
    }
}

#[async_trait]
impl TermsSource for HttpIntakeClient {
    async fn fetch_terms(&self) -> Result<String, AppError> {
        let url = self.url("/terms");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::TermsUnavailable { message: e.to_string() })?;

        if !resp.status().is_success() {
            return Err(AppError::TermsUnavailable {
                message: format!("server answered {}", resp.status()),
            });
        }

        resp.json::<TermsResponse>()
            .await
            .map(|t| t.terms)
            .map_err(|e| AppError::TermsUnavailable { message: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let client = HttpIntakeClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/verify"), "http://localhost:5000/verify");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        // Port 9 (discard) on loopback is essentially never listening.
        let client = HttpIntakeClient::new("http://127.0.0.1:9");
        let req = IntakeRequest::new("hello", None).unwrap();
        let err = client.exchange(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Network { .. }), "got {err:?}");
    }
}
