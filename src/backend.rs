//! Blocking HTTP client for the planning backend.
//!
//! Calls are made from worker threads only; the UI thread never waits on them.

use crate::error::{Result, ShellError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A location in screenshot pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TaskResponse {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub task_description: Option<String>,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub audio_base64: Option<String>,
}

impl TaskResponse {
    pub fn point(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StatusInfo {
    pub status: String,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default)]
    pub coordinates: Option<[i32; 2]>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub task_history_count: Option<u32>,
}

impl StatusInfo {
    /// One-line rendering for the panel.
    pub fn summary(&self) -> String {
        let mut out = self.status.clone();
        if let Some(task) = &self.current_task {
            out.push_str(&format!(" | task: {task}"));
            if let Some(description) = self.task_description.as_ref().filter(|d| *d != task) {
                out.push_str(&format!(" ({description})"));
            }
            if let Some([x, y]) = self.coordinates {
                out.push_str(&format!(" @ ({x}, {y})"));
            }
            out.push_str(&format!(" | history: {}", self.task_history_count.unwrap_or(0)));
            if self.is_completed == Some(true) {
                out.push_str(" | completed");
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ResetAck {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HealthInfo {
    pub status: String,
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    user_query: &'a str,
    screenshot_base64: &'a str,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    screenshot_base64: &'a str,
}

pub struct BackendClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShellError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn initialize(&self, query: &str, screenshot_base64: &str) -> Result<TaskResponse> {
        let body = InitializeBody { user_query: query, screenshot_base64 };
        self.post("/initialize", Some(&body))
    }

    pub fn update_screenshot(&self, screenshot_base64: &str) -> Result<TaskResponse> {
        self.post("/update_screenshot", Some(&UpdateBody { screenshot_base64 }))
    }

    pub fn status(&self) -> Result<StatusInfo> {
        self.get("/status")
    }

    pub fn reset(&self) -> Result<ResetAck> {
        self.post::<(), _>("/reset", None)
    }

    pub fn health(&self) -> Result<HealthInfo> {
        self.get("/health")
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T> {
        debug!("GET {}{}", self.base_url, endpoint);
        let response = self.http.get(format!("{}{}", self.base_url, endpoint)).send()?;
        Self::decode(endpoint, response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: Option<&B>,
    ) -> Result<T> {
        debug!("POST {}{}", self.base_url, endpoint);
        let mut request = self.http.post(format!("{}{}", self.base_url, endpoint));
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::decode(endpoint, request.send()?)
    }

    fn decode<T: DeserializeOwned>(
        endpoint: &'static str,
        response: reqwest::blocking::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ShellError::Status { endpoint, status: status.as_u16() });
        }
        response
            .json::<T>()
            .map_err(|e| ShellError::Transport(format!("invalid {endpoint} payload: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Read;
    use std::thread;

    #[derive(Debug)]
    pub(crate) struct Recorded {
        pub method: String,
        pub url: String,
        pub body: String,
    }

    /// Serves the canned responses in order, then stops.
    pub(crate) fn fake_backend(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, crossbeam_channel::Receiver<Recorded>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let (tx, rx) = crossbeam_channel::unbounded();

        thread::spawn(move || {
            for (code, payload) in responses {
                let Ok(mut request) = server.recv() else { break };
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).unwrap();
                let _ = tx.send(Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body,
                });
                let header: tiny_http::Header = "Content-Type: application/json".parse().unwrap();
                let response = tiny_http::Response::from_string(payload)
                    .with_status_code(code)
                    .with_header(header);
                request.respond(response).unwrap();
            }
        });

        (format!("http://127.0.0.1:{port}"), rx)
    }

    fn client(url: &str) -> BackendClient {
        BackendClient::new(url, Some(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_initialize_posts_query_and_screenshot() {
        let (url, rx) = fake_backend(vec![(
            200,
            r#"{"x":500,"y":300,"task":"Click inbox","task_description":"Open the inbox","is_completed":false}"#,
        )]);
        let resp = client(&url).initialize("open mail", "QUJD").unwrap();
        assert_eq!(resp.point(), ScreenPoint::new(500, 300));
        assert_eq!(resp.task, "Click inbox");
        assert!(!resp.is_completed);
        assert!(resp.audio_base64.is_none());

        let rec = rx.recv().unwrap();
        assert_eq!(rec.method, "POST");
        assert_eq!(rec.url, "/initialize");
        let body: serde_json::Value = serde_json::from_str(&rec.body).unwrap();
        assert_eq!(body["user_query"], "open mail");
        assert_eq!(body["screenshot_base64"], "QUJD");
    }

    #[test]
    fn test_update_screenshot_sends_only_screenshot() {
        let (url, rx) = fake_backend(vec![(
            200,
            r#"{"x":0,"y":0,"task":"Task completed","is_completed":true,"audio_base64":"SUQz"}"#,
        )]);
        let resp = client(&url).update_screenshot("WFla").unwrap();
        assert!(resp.is_completed);
        assert_eq!(resp.audio_base64.as_deref(), Some("SUQz"));

        let rec = rx.recv().unwrap();
        assert_eq!(rec.url, "/update_screenshot");
        let body: serde_json::Value = serde_json::from_str(&rec.body).unwrap();
        assert_eq!(body["screenshot_base64"], "WFla");
        assert!(body.get("user_query").is_none());
    }

    #[test]
    fn test_non_2xx_is_transport_error() {
        let (url, _rx) = fake_backend(vec![(400, r#"{"detail":"No active session"}"#)]);
        let err = client(&url).update_screenshot("AA==").unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, ShellError::Status { endpoint: "/update_screenshot", status: 400 }));
    }

    #[test]
    fn test_malformed_body_is_transport_error() {
        let (url, _rx) = fake_backend(vec![(200, r#"{"task":"no coordinates"}"#)]);
        let err = client(&url).initialize("q", "AA==").unwrap_err();
        assert!(matches!(err, ShellError::Transport(_)));
    }

    #[test]
    fn test_unreachable_backend_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = client(&format!("http://127.0.0.1:{port}")).health().unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_status_reset_and_health() {
        let (url, rx) = fake_backend(vec![
            (
                200,
                r#"{"status":"Active session","current_task":"Click inbox","coordinates":[500,300],"is_completed":false,"task_history_count":2}"#,
            ),
            (200, r#"{"message":"Session reset successfully"}"#),
            (200, r#"{"status":"healthy"}"#),
        ]);
        let backend = client(&format!("{url}/"));

        let status = backend.status().unwrap();
        assert_eq!(status.coordinates, Some([500, 300]));
        assert_eq!(
            status.summary(),
            "Active session | task: Click inbox @ (500, 300) | history: 2"
        );
        assert_eq!(backend.reset().unwrap().message, "Session reset successfully");
        assert_eq!(backend.health().unwrap().status, "healthy");

        let urls: Vec<_> = rx.iter().take(3).map(|r| (r.method, r.url)).collect();
        assert_eq!(
            urls,
            vec![
                ("GET".to_string(), "/status".to_string()),
                ("POST".to_string(), "/reset".to_string()),
                ("GET".to_string(), "/health".to_string()),
            ]
        );
    }

    #[test]
    fn test_idle_status_summary() {
        let status: StatusInfo = serde_json::from_str(r#"{"status":"No active session"}"#).unwrap();
        assert_eq!(status.summary(), "No active session");
    }

    #[test]
    fn test_finished_status_summary() {
        let status: StatusInfo = serde_json::from_str(
            r#"{"status":"Active session","current_task":"Send","task_description":"Press send",
                "is_completed":true,"task_history_count":4}"#,
        )
        .unwrap();
        assert_eq!(
            status.summary(),
            "Active session | task: Send (Press send) | history: 4 | completed"
        );
    }
}
