//! Authenticated transport for the remote API.
//!
//! A [`Session`] authenticates once against the entry server, keeps the
//! bearer token, and composes every later URL from whichever server is
//! current: the entry server until a task is started, then the working
//! server the remote side assigned to that task.
//!
//! ## Status handling
//!
//! Anything that is not 2xx/3xx is a failure. The body is always read
//! before the error is built so callers see the server's own explanation
//! next to the status line.

use crate::config::ClientConfig;
use crate::error::PdfTaskError;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Form-encoded key/value pairs, sent in insertion order.
pub type Payload = Vec<(String, String)>;

/// Multipart field name the remote API expects for uploaded files.
pub const FILE_FIELD: &str = "file";

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

/// Authenticated HTTP session bound to one remote account.
#[derive(Clone)]
pub struct Session {
    config: ClientConfig,
    http: Client,
    public_key: Option<String>,
    token: Option<String>,
    working_server: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("public_key", &self.public_key)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("working_server", &self.working_server)
            .finish()
    }
}

impl Session {
    /// Build an unauthenticated session. Performs no network I/O.
    pub fn new(config: ClientConfig) -> Result<Self, PdfTaskError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| PdfTaskError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            public_key: None,
            token: None,
            working_server: None,
        })
    }

    /// Build a session and authenticate it in one step.
    pub async fn connect(
        config: ClientConfig,
        public_key: impl Into<String>,
    ) -> Result<Self, PdfTaskError> {
        let mut session = Self::new(config)?;
        session.authenticate(public_key).await?;
        Ok(session)
    }

    /// Exchange the public key for a bearer token.
    ///
    /// Always talks to the entry server, even if a working server is known.
    pub async fn authenticate(&mut self, public_key: impl Into<String>) -> Result<(), PdfTaskError> {
        let public_key = public_key.into();
        let url = format!("{}/auth", self.config.base_url(&self.config.entry_server));
        debug!(url = %url, "authenticating");

        let builder = self
            .http
            .post(&url)
            .form(&[("public_key", public_key.as_str())]);
        let response = send(builder, &url).await?;
        if is_failure(response.status()) {
            return Err(status_error(response, &url, true).await);
        }

        let auth: AuthResponse = read_json(response, &url, "auth")
            .await?
            .ok_or_else(|| PdfTaskError::MalformedResponse {
                endpoint: "auth".into(),
                detail: "empty body, expected a token".into(),
            })?;

        self.public_key = Some(public_key);
        self.token = Some(auth.token);
        info!("Authenticated against {}", self.config.entry_server);
        Ok(())
    }

    /// Issue a request to `endpoint` on the current target server.
    ///
    /// `payload` is form-encoded, or sent as multipart text fields when
    /// `file` is given; `file` is streamed from disk as the `file` part.
    /// The response body is left unread so callers can stream it.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Payload>,
        file: Option<&Path>,
    ) -> Result<Response, PdfTaskError> {
        let url = self.url(endpoint);
        debug!(method = %method, url = %url, "sending request");

        let mut builder = self.authorize(self.http.request(method, &url));

        let payload = payload.map(|mut p| {
            if self.config.debug {
                p.push(("debug".to_string(), "true".to_string()));
            }
            p
        });

        builder = match file {
            Some(path) => builder.multipart(multipart_form(payload.unwrap_or_default(), path).await?),
            None => match payload {
                Some(p) => builder.form(&p),
                None => builder,
            },
        };

        let response = send(builder, &url).await?;
        if is_failure(response.status()) {
            return Err(status_error(response, &url, false).await);
        }
        Ok(response)
    }

    /// [`request`](Self::request) and decode the JSON body.
    ///
    /// An empty body (or a literal `null`) decodes to `None`. Any other body
    /// that does not match `T`, including `{}` when `T` has required fields,
    /// is a [`PdfTaskError::MalformedResponse`].
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Payload>,
        file: Option<&Path>,
    ) -> Result<Option<T>, PdfTaskError> {
        let response = self.request(method, endpoint, payload, file).await?;
        let url = response.url().to_string();
        read_json(response, &url, endpoint).await
    }

    /// Full URL for `endpoint` on the current target server.
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url(self.target_server()),
            endpoint.trim_start_matches('/')
        )
    }

    /// Working server if one is assigned, else the entry server.
    pub fn target_server(&self) -> &str {
        self.working_server
            .as_deref()
            .unwrap_or(&self.config.entry_server)
    }

    pub fn working_server(&self) -> Option<&str> {
        self.working_server.as_deref()
    }

    pub fn set_working_server(&mut self, server: impl Into<String>) {
        self.working_server = Some(server.into());
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn is_failure(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

async fn send(builder: RequestBuilder, url: &str) -> Result<Response, PdfTaskError> {
    builder.send().await.map_err(|e| PdfTaskError::Transport {
        url: url.to_string(),
        source: e,
    })
}

/// Turn a non-success response into an error, keeping its body.
async fn status_error(response: Response, url: &str, auth: bool) -> PdfTaskError {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("").to_string();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<body unreadable: {e}>"));
    let url = url.to_string();
    let status = status.as_u16();

    if auth {
        PdfTaskError::Auth {
            url,
            status,
            reason,
            body,
        }
    } else {
        PdfTaskError::Request {
            url,
            status,
            reason,
            body,
        }
    }
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    url: &str,
    endpoint: &str,
) -> Result<Option<T>, PdfTaskError> {
    let text = response.text().await.map_err(|e| PdfTaskError::Transport {
        url: url.to_string(),
        source: e,
    })?;
    decode_body(endpoint, &text)
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    endpoint: &str,
    text: &str,
) -> Result<Option<T>, PdfTaskError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| PdfTaskError::MalformedResponse {
            endpoint: endpoint.to_string(),
            detail: format!("not JSON: {e}"),
        })?;
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| PdfTaskError::MalformedResponse {
            endpoint: endpoint.to_string(),
            detail: e.to_string(),
        })
}

async fn multipart_form(payload: Payload, path: &Path) -> Result<Form, PdfTaskError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PdfTaskError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PdfTaskError::FileReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let len = file
        .metadata()
        .await
        .map_err(|e| PdfTaskError::FileReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let mut form = Form::new();
    for (key, value) in payload {
        form = form.text(key, value);
    }
    Ok(form.part(
        FILE_FIELD,
        Part::stream_with_length(Body::from(file), len).file_name(filename),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Start {
        task: String,
    }

    fn session() -> Session {
        let config = ClientConfig::builder()
            .scheme("http")
            .entry_server("entry.local:8080")
            .build()
            .unwrap();
        Session::new(config).unwrap()
    }

    #[test]
    fn url_uses_entry_until_working_server_assigned() {
        let mut s = session();
        assert_eq!(s.url("start/compress"), "http://entry.local:8080/v1/start/compress");
        s.set_working_server("api8.local");
        assert_eq!(s.url("/upload"), "http://api8.local/v1/upload");
        assert_eq!(s.working_server(), Some("api8.local"));
    }

    #[test]
    fn new_session_is_unauthenticated() {
        let s = session();
        assert!(!s.is_authenticated());
        assert!(s.public_key().is_none());
        assert!(format!("{s:?}").contains("entry.local"));
    }

    #[test]
    fn decode_distinguishes_absent_from_malformed() {
        assert!(decode_body::<Start>("start", "").unwrap().is_none());
        assert!(decode_body::<Start>("start", "  null ").unwrap().is_none());

        let err = decode_body::<Start>("start", "{}").unwrap_err();
        assert!(matches!(err, PdfTaskError::MalformedResponse { .. }));

        let err = decode_body::<Start>("start", "<html>").unwrap_err();
        assert!(err.to_string().contains("not JSON"));

        let ok = decode_body::<Start>("start", r#"{"task":"t1"}"#).unwrap().unwrap();
        assert_eq!(ok.task, "t1");
    }

    #[test]
    fn failure_statuses() {
        assert!(!is_failure(StatusCode::OK));
        assert!(!is_failure(StatusCode::FOUND));
        assert!(is_failure(StatusCode::BAD_REQUEST));
        assert!(is_failure(StatusCode::BAD_GATEWAY));
    }
}
