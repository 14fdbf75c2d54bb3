//! HTTP access to the monitoring backend

use crate::errors::{DashboardError, Result};
use crate::models::{Alert, BackendHealth, Service};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SERVICES_PATH: &str = "/api/services";
pub const ALERTS_PATH: &str = "/api/alerts";
pub const SIMULATE_INCIDENT_PATH: &str = "/api/simulate-incident";
pub const HEALTH_PATH: &str = "/health";

/// Operations the dashboard needs from the backend
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    async fn services(&self) -> Result<Vec<Service>>;
    async fn alerts(&self) -> Result<Vec<Alert>>;
    /// Ask the backend to synthesize an incident; the response body is unused
    async fn simulate_incident(&self, service_name: &str) -> Result<()>;
}

/// reqwest-backed client for the backend REST API
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("ops_dashboard/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DashboardError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = check_status(response, path)?;

        // Decode from text so a malformed body surfaces as a JSON error.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Probe the backend health endpoint
    pub async fn health_check(&self) -> Result<BackendHealth> {
        debug!("Performing health check against {}", self.url(HEALTH_PATH));
        self.get_json(HEALTH_PATH).await
    }

    /// Log whether the backend is reachable; never fails
    pub async fn test_connectivity(&self) -> bool {
        match self.health_check().await {
            Ok(health) => {
                info!("Backend at {} reports status {}", self.base_url, health.status);
                true
            }
            Err(e) => {
                warn!("Backend connectivity test failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl MonitoringApi for HttpApi {
    async fn services(&self) -> Result<Vec<Service>> {
        self.get_json(SERVICES_PATH).await
    }

    async fn alerts(&self) -> Result<Vec<Alert>> {
        self.get_json(ALERTS_PATH).await
    }

    async fn simulate_incident(&self, service_name: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(SIMULATE_INCIDENT_PATH))
            .query(&[("service_name", service_name)])
            .send()
            .await?;

        check_status(response, SIMULATE_INCIDENT_PATH)?;
        Ok(())
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(DashboardError::Status {
        endpoint: endpoint.to_string(),
        code: status.as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthStatus, Severity};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpApi {
        HttpApi::new(server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_base_url_is_normalized() {
        let api = HttpApi::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.url(SERVICES_PATH), "http://localhost:8000/api/services");
    }

    #[tokio::test]
    async fn test_fetch_services() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SERVICES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "payment-api", "status": "healthy", "uptime": 99.9, "last_check": 1700000000.5},
                {"id": 2, "name": "user-service", "status": "unhealthy", "uptime": 97.0, "last_check": 1700000000.5}
            ])))
            .mount(&server)
            .await;

        let services = api(&server).services().await.unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "payment-api");
        assert_eq!(services[1].status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_fetch_alerts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ALERTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "severity": "warning", "service": "payment-api",
                 "message": "High response time detected", "timestamp": 1699999700.0, "status": "active"}
            ])))
            .mount(&server)
            .await;

        let alerts = api(&server).alerts().await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ALERTS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        match api(&server).alerts().await {
            Err(DashboardError::Status { endpoint, code }) => {
                assert_eq!(endpoint, ALERTS_PATH);
                assert_eq!(code, 503);
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SERVICES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = api(&server).services().await;
        assert!(matches!(result, Err(DashboardError::Json(_))));
    }

    #[tokio::test]
    async fn test_simulate_incident_encodes_service_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SIMULATE_INCIDENT_PATH))
            .and(query_param("service_name", "user service"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "incident"})))
            .expect(1)
            .mount(&server)
            .await;

        tokio_test::assert_ok!(api(&server).simulate_incident("user service").await);
    }

    #[tokio::test]
    async fn test_connectivity_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HEALTH_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "healthy", "timestamp": 1700000000.0})),
            )
            .mount(&server)
            .await;

        let api = api(&server);
        let health = api.health_check().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert!(api.test_connectivity().await);

        let unreachable = HttpApi::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert!(!unreachable.test_connectivity().await);
    }
}
