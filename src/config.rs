//! Client configuration.
//!
//! All transport behaviour is controlled through [`ClientConfig`], built via
//! its [`ClientConfigBuilder`]. Nothing is read from ambient state: the CLI
//! maps its flags and environment variables onto the builder, library users
//! set what they need and rely on the defaults for the rest.

use crate::error::PdfTaskError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Public entry point of the remote API. Used for `auth` and the first `start`.
pub const DEFAULT_ENTRY_SERVER: &str = "api.ilovepdf.com";

/// API version segment prefixed to every endpoint.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Configuration shared by a [`crate::session::Session`] and every task it serves.
///
/// # Example
/// ```rust
/// use edgequake_pdftask::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .request_timeout_secs(Some(120))
///     .upload_concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.entry_server, "api.ilovepdf.com");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// URL scheme, `https` (default) or `http`.
    pub scheme: String,

    /// Host (optionally `host:port`) used for authentication and for starting
    /// a task. Once the server assigns a working server, that one is used
    /// instead.
    pub entry_server: String,

    /// API version path segment. Default: `v1`.
    pub api_version: String,

    /// Append `debug=true` to every payload. Default: false.
    ///
    /// The remote API echoes the request back instead of processing it,
    /// which is handy when wiring up a new tool.
    pub debug: bool,

    /// TCP/TLS connect timeout in seconds. Default: 30.
    pub connect_timeout_secs: u64,

    /// Overall timeout per request in seconds. Default: 600. `None` waits forever.
    ///
    /// Covers the whole exchange including streamed downloads, so large
    /// results need a generous value.
    pub request_timeout_secs: Option<u64>,

    /// Maximum uploads in flight for one task. Default: 1 (sequential).
    pub upload_concurrency: usize,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Lifecycle events receiver. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            entry_server: DEFAULT_ENTRY_SERVER.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            debug: false,
            connect_timeout_secs: 30,
            request_timeout_secs: Some(600),
            upload_concurrency: 1,
            user_agent: concat!("edgequake-pdftask/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("scheme", &self.scheme)
            .field("entry_server", &self.entry_server)
            .field("api_version", &self.api_version)
            .field("debug", &self.debug)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("upload_concurrency", &self.upload_concurrency)
            .field("user_agent", &self.user_agent)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn TaskProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Base URL for `server`, e.g. `https://api8.ilovepdf.com/v1`.
    pub fn base_url(&self, server: &str) -> String {
        format!(
            "{}://{}/{}",
            self.scheme,
            server.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into().to_lowercase();
        self
    }

    pub fn entry_server(mut self, server: impl Into<String>) -> Self {
        self.config.entry_server = server.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.config.debug = v;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn upload_concurrency(mut self, n: usize) -> Self {
        self.config.upload_concurrency = n;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, PdfTaskError> {
        let c = &self.config;
        if c.scheme != "https" && c.scheme != "http" {
            return Err(PdfTaskError::InvalidConfig(format!(
                "scheme must be http or https, got '{}'",
                c.scheme
            )));
        }
        if c.entry_server.trim().is_empty() {
            return Err(PdfTaskError::InvalidConfig(
                "entry server must not be empty".into(),
            ));
        }
        if c.entry_server.contains("://") {
            return Err(PdfTaskError::InvalidConfig(format!(
                "entry server is a host, not a URL: '{}'",
                c.entry_server
            )));
        }
        if c.api_version.trim_matches('/').is_empty() {
            return Err(PdfTaskError::InvalidConfig(
                "API version must not be empty".into(),
            ));
        }
        if c.upload_concurrency == 0 {
            return Err(PdfTaskError::InvalidConfig(
                "upload concurrency must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(PdfTaskError::InvalidConfig(
                "request timeout must be ≥ 1s (use None to disable)".into(),
            ));
        }
        Ok(self.config)
    }
}
