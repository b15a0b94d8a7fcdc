//! Mapbox Directions client implementing [`RoutingService`].
//!
//! - Connection pooling and keepalive on a shared `reqwest::Client`
//! - Requests over the per-request waypoint limit are rejected before any I/O
//! - Automatic retry with exponential backoff on 429 and transport errors
//!
//! Every failure is returned as a [`RoutingError`]; the reconstructor decides
//! what to do with it.

use crate::config::RoutingConfig;
use crate::error::{Result, TrackingError};
use crate::routing::{Profile, RouteResponse, RoutingError, RoutingService};
use crate::Coordinate;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Most waypoints the Directions API accepts in one request.
pub const MAX_WAYPOINTS: usize = 25;

const MAX_IDLE_PER_HOST: usize = 4;

/// Directions API response body.
#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    geometry: ApiGeometry,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct ApiGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Backoff before retry number `attempt` (1-based): 500ms, 1s, 2s, 4s max.
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * (1 << attempt.saturating_sub(1).min(3)))
}

/// Directions URL for `waypoints`, without the access token.
///
/// # Example
/// ```
/// use route_tracker::{Coordinate, Profile, RoutingConfig};
/// use route_tracker::http::build_url;
///
/// let url = build_url(
///     &RoutingConfig::default(),
///     &[Coordinate::new(-6.2, 106.8), Coordinate::new(-6.3, 106.9)],
///     Profile::Driving,
/// );
/// assert_eq!(
///     url,
///     "https://api.mapbox.com/directions/v5/mapbox/driving/106.8,-6.2;106.9,-6.3?geometries=geojson&overview=full"
/// );
/// ```
pub fn build_url(config: &RoutingConfig, waypoints: &[Coordinate], profile: Profile) -> String {
    let coordinates: Vec<String> = waypoints
        .iter()
        .map(|c| format!("{},{}", c.longitude, c.latitude))
        .collect();

    format!(
        "{}/directions/v5/mapbox/{}/{}?geometries=geojson&overview=full",
        config.base_url.trim_end_matches('/'),
        profile,
        coordinates.join(";")
    )
}

/// Interpret a Directions response body.
///
/// The first route is used. A code other than `Ok`, an empty route list or
/// a body that is not a Directions response is an error.
pub fn parse_directions_response(body: &[u8]) -> std::result::Result<RouteResponse, RoutingError> {
    let data: DirectionsResponse = serde_json::from_slice(body).map_err(|e| RoutingError::Malformed {
        message: e.to_string(),
    })?;

    if data.code != "Ok" {
        if let Some(message) = &data.message {
            debug!("[Mapbox] {}: {}", data.code, message);
        }
        return Err(RoutingError::NoRoute { code: data.code });
    }

    let route = data.routes.into_iter().next().ok_or_else(|| RoutingError::NoRoute {
        code: "NoRoute".to_string(),
    })?;

    Ok(RouteResponse {
        geometry: route
            .geometry
            .coordinates
            .into_iter()
            .map(Coordinate::from_lng_lat)
            .collect(),
        distance_meters: route.distance,
        duration_seconds: route.duration,
    })
}

/// Routing through the Mapbox Directions API.
pub struct MapboxDirections {
    client: Client,
    config: RoutingConfig,
}

impl MapboxDirections {
    /// Create a client. Fails only if the HTTP client cannot be built.
    pub fn new(config: RoutingConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TrackingError::Http {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    fn validate_request(waypoints: &[Coordinate]) -> std::result::Result<(), RoutingError> {
        if waypoints.len() < 2 || waypoints.len() > MAX_WAYPOINTS {
            return Err(RoutingError::InvalidRequest {
                message: format!("{} waypoints (expected 2 to {})", waypoints.len(), MAX_WAYPOINTS),
            });
        }
        if let Some(bad) = waypoints.iter().find(|c| !c.is_valid()) {
            return Err(RoutingError::InvalidRequest {
                message: format!("invalid coordinate {:?}", bad),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RoutingService for MapboxDirections {
    fn is_available(&self) -> bool {
        self.config.has_credential()
    }

    async fn route(&self, waypoints: &[Coordinate], profile: Profile) -> std::result::Result<RouteResponse, RoutingError> {
        let token = match self.config.access_token.as_deref() {
            Some(token) if self.config.has_credential() => token,
            _ => return Err(RoutingError::Unavailable),
        };
        Self::validate_request(waypoints)?;

        let url = build_url(&self.config, waypoints, profile);
        let req_start = Instant::now();
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[("access_token", token)])
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > self.config.max_retries {
                            return Err(RoutingError::RateLimited { attempts: retries });
                        }
                        let wait = backoff(retries);
                        warn!(
                            "[Mapbox] 429 Too Many Requests after {:?}, retry {} with {:?} backoff",
                            req_start.elapsed(),
                            retries,
                            wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    // Mapbox reports NoRoute/NoSegment in the body, sometimes with a 4xx
                    let bytes = resp.bytes().await.map_err(|e| RoutingError::Transport {
                        message: format!("Body download error: {}", e),
                    })?;

                    if !status.is_success() {
                        return match parse_directions_response(&bytes) {
                            Err(RoutingError::NoRoute { code }) => Err(RoutingError::NoRoute { code }),
                            _ => Err(RoutingError::Status {
                                status_code: status.as_u16(),
                            }),
                        };
                    }

                    let route = parse_directions_response(&bytes)?;
                    debug!(
                        "[Mapbox] {} waypoints -> {} points, {:.0} m in {:?}",
                        waypoints.len(),
                        route.geometry.len(),
                        route.distance_meters,
                        req_start.elapsed()
                    );
                    return Ok(route);
                }
                Err(e) => {
                    retries += 1;
                    if retries > self.config.max_retries {
                        return Err(RoutingError::Transport {
                            message: format!("Request error: {}", e.without_url()),
                        });
                    }

                    let wait = backoff(retries);
                    warn!(
                        "[Mapbox] Error: {}, retry {} after {:?}",
                        e.without_url(),
                        retries,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const OK_BODY: &str = r#"{"code":"Ok","routes":[{"geometry":{"coordinates":[[106.8,-6.2],[106.9,-6.3]]},"distance":15000.0,"duration":1800.0}]}"#;

    fn two_points() -> Vec<Coordinate> {
        vec![Coordinate::new(-6.2, 106.8), Coordinate::new(-6.3, 106.9)]
    }

    /// Local server answering one request per connection with the next
    /// canned `(status, body)`; `None` hangs up without answering. The last
    /// entry repeats once the list runs out. Returns the base URL and a
    /// counter of requests received.
    async fn stub_server(replies: Vec<Option<(u16, &'static str)>>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let reply = replies.get(n).or(replies.last()).copied().flatten();

                let mut head = Vec::new();
                let mut buf = [0u8; 4096];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(k) => head.extend_from_slice(&buf[..k]),
                    }
                }

                if let Some((status, body)) = reply {
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                }
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn client_for(base_url: String, max_retries: u32) -> MapboxDirections {
        let config = RoutingConfig {
            base_url,
            max_retries,
            request_timeout_secs: 5,
            ..Default::default()
        }
        .with_access_token("pk.test");
        MapboxDirections::new(config).unwrap()
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff(1), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_millis(1000));
        assert_eq!(backoff(3), Duration::from_millis(2000));
        assert_eq!(backoff(10), Duration::from_millis(4000));
    }

    #[test]
    fn test_build_url() {
        let config = RoutingConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let url = build_url(&config, &two_points(), Profile::Walking);
        assert_eq!(
            url,
            "http://localhost:8080/directions/v5/mapbox/walking/106.8,-6.2;106.9,-6.3?geometries=geojson&overview=full"
        );
        assert!(!url.contains("access_token"));
    }

    #[test]
    fn test_parse_ok() {
        let body = br#"{
            "code": "Ok",
            "routes": [{
                "geometry": { "type": "LineString", "coordinates": [[106.8, -6.2], [106.85, -6.25], [106.9, -6.3]] },
                "distance": 15234.5,
                "duration": 1810.2
            }],
            "waypoints": []
        }"#;
        let route = parse_directions_response(body).unwrap();
        assert_eq!(route.geometry.len(), 3);
        assert_eq!(route.geometry[0], Coordinate::new(-6.2, 106.8));
        assert_eq!(route.distance_meters, 15234.5);
        assert_eq!(route.duration_seconds, 1810.2);
    }

    #[test]
    fn test_parse_failures() {
        let no_route = br#"{ "code": "NoRoute", "message": "No route found", "routes": [] }"#;
        assert_eq!(
            parse_directions_response(no_route),
            Err(RoutingError::NoRoute { code: "NoRoute".into() })
        );

        let empty = br#"{ "code": "Ok", "routes": [] }"#;
        assert!(matches!(parse_directions_response(empty), Err(RoutingError::NoRoute { .. })));

        let garbage = b"<html>Bad Gateway</html>";
        assert!(matches!(parse_directions_response(garbage), Err(RoutingError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_unavailable_without_token() {
        let service = MapboxDirections::new(RoutingConfig::default()).unwrap();
        assert!(!service.is_available());
        assert_eq!(
            service.route(&two_points(), Profile::Driving).await,
            Err(RoutingError::Unavailable)
        );

        let blank = MapboxDirections::new(RoutingConfig::default().with_access_token("  ")).unwrap();
        assert!(!blank.is_available());
    }

    #[tokio::test]
    async fn test_request_size_checked_before_io() {
        // Unroutable base URL: any I/O would fail with a transport error instead
        let config = RoutingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        }
        .with_access_token("pk.test");
        let service = MapboxDirections::new(config).unwrap();
        assert!(service.is_available());

        let too_many: Vec<Coordinate> = (0..26).map(|i| Coordinate::new(-6.2, 106.8 + i as f64 * 0.01)).collect();
        assert!(matches!(
            service.route(&too_many, Profile::Driving).await,
            Err(RoutingError::InvalidRequest { .. })
        ));
        assert!(matches!(
            service.route(&too_many[..1], Profile::Driving).await,
            Err(RoutingError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limited_after_retries() {
        let (url, hits) = stub_server(vec![Some((429, r#"{"message":"Too Many Requests"}"#))]).await;
        let service = client_for(url, 2);

        let started = Instant::now();
        let result = service.route(&two_points(), Profile::Driving).await;

        assert_eq!(result, Err(RoutingError::RateLimited { attempts: 3 }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        // 500 ms then 1 s of backoff
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_429_then_success() {
        let (url, hits) = stub_server(vec![Some((429, "{}")), Some((200, OK_BODY))]).await;
        let service = client_for(url, 3);

        let route = service.route(&two_points(), Profile::Driving).await.unwrap();
        assert_eq!(route.geometry.len(), 2);
        assert_eq!(route.distance_meters, 15000.0);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_errors_retried() {
        let (url, hits) = stub_server(vec![None]).await;
        let service = client_for(url, 1);

        let started = Instant::now();
        let result = service.route(&two_points(), Profile::Driving).await;

        assert!(matches!(result, Err(RoutingError::Transport { .. })), "{:?}", result);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let (url, hits) = stub_server(vec![Some((
            422,
            r#"{"code":"NoRoute","message":"No route found","routes":[]}"#,
        ))])
        .await;
        let result = client_for(url, 3).route(&two_points(), Profile::Driving).await;
        assert_eq!(result, Err(RoutingError::NoRoute { code: "NoRoute".into() }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let (url, hits) = stub_server(vec![Some((500, "upstream exploded"))]).await;
        let result = client_for(url, 3).route(&two_points(), Profile::Driving).await;
        assert_eq!(result, Err(RoutingError::Status { status_code: 500 }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
