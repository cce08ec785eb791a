use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{Coordinates, LocationError, LocationSource};

/// Always reports the same position. Used for configured home locations and tests.
#[derive(Debug, Clone)]
pub struct FixedLocationSource {
    coords: Coordinates,
}

impl FixedLocationSource {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coords)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// No provider configured.
#[derive(Debug, Clone, Default)]
pub struct UnavailableLocationSource;

#[async_trait]
impl LocationSource for UnavailableLocationSource {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::NoProvider)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Body returned by a position endpoint. Accepts both `latitude`/`longitude`
/// and the short `lat`/`lon` spelling used by IP geolocation services.
#[derive(Debug, Deserialize)]
struct PositionResponse {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

/// Fetches the position from an HTTP endpoint returning JSON.
#[derive(Debug, Clone)]
pub struct HttpLocationSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpLocationSource {
    pub fn new(endpoint: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn parse_position(body: &str) -> Result<Coordinates, LocationError> {
    let parsed: PositionResponse =
        serde_json::from_str(body).map_err(|e| LocationError::Source(e.to_string()))?;
    Ok(Coordinates::new(parsed.latitude, parsed.longitude))
}

#[async_trait]
impl LocationSource for HttpLocationSource {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| LocationError::Source(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::Source(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LocationError::Source(e.to_string()))?;
        parse_position(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one canned HTTP response on a local port; returns the endpoint URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            assert!(request.starts_with(b"GET /position "));
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}/position", addr)
    }

    #[tokio::test]
    async fn test_http_source_reads_position() {
        let url = serve_once("200 OK", r#"{"lat": 28.6139, "lon": 77.209}"#).await;
        let source = HttpLocationSource::new(&url, Duration::from_secs(5)).unwrap();
        assert_eq!(
            source.current_position().await.unwrap(),
            Coordinates::new(28.6139, 77.209)
        );
    }

    #[tokio::test]
    async fn test_http_source_reports_error_status() {
        let url = serve_once("503 Service Unavailable", "{}").await;
        let source = HttpLocationSource::new(&url, Duration::from_secs(5)).unwrap();
        match source.current_position().await {
            Err(LocationError::Source(message)) => assert!(message.contains("503")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_source_rejects_malformed_body() {
        let url = serve_once("200 OK", "not json").await;
        let source = HttpLocationSource::new(&url, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            source.current_position().await,
            Err(LocationError::Source(_))
        ));
    }

    #[test]
    fn test_parse_long_field_names() {
        let coords = parse_position(r#"{"latitude": 12.97, "longitude": 77.59}"#).unwrap();
        assert_eq!(coords, Coordinates::new(12.97, 77.59));
    }

    #[test]
    fn test_parse_short_field_names() {
        let coords =
            parse_position(r#"{"status": "success", "lat": 19.07, "lon": 72.87}"#).unwrap();
        assert_eq!(coords, Coordinates::new(19.07, 72.87));
    }

    #[test]
    fn test_parse_missing_fields() {
        assert!(matches!(
            parse_position(r#"{"status": "fail"}"#),
            Err(LocationError::Source(_))
        ));
    }

    #[test]
    fn test_http_source_rejects_bad_url() {
        assert!(HttpLocationSource::new("not a url", Duration::from_secs(1)).is_err());
    }
}
