//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the upload relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Remote backend the uploads are forwarded to.
    pub upstream: UpstreamConfig,

    /// Upload acceptance rules and scratch storage.
    pub uploads: UploadConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Remote backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Remote upload URL. `None` or a placeholder value selects local mode.
    pub url: Option<String>,

    /// Case-insensitive substrings marking `url` as a placeholder.
    pub placeholder_markers: Vec<String>,

    /// Total timeout for the outbound exchange in seconds (0 = unbounded).
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds (0 = unbounded).
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    /// The configured URL, or `None` when the relay should run in local mode.
    pub fn forward_url(&self) -> Option<&str> {
        let url = self.url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }

        let lowered = url.to_lowercase();
        let placeholder = self
            .placeholder_markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| lowered.contains(&m.to_lowercase()));

        if placeholder {
            None
        } else {
            Some(url)
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Point it at the real backend.
            url: Some("https://your-backend.example.com/api/lead-upload".to_string()),
            placeholder_markers: vec!["your-backend".to_string(), "seu-backend".to_string()],
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// Upload acceptance rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory used to stage files between receipt and forwarding.
    pub scratch_dir: String,

    /// Multipart field name carrying the files.
    pub field_name: String,

    /// Maximum number of files per request.
    pub max_files: usize,

    /// Maximum size of a single file in bytes.
    pub max_file_size: u64,

    /// Accepted MIME types (without parameters).
    pub allowed_mime_types: Vec<String>,

    /// Keep staged files after a local-mode response.
    pub retain_in_local_mode: bool,
}

/// Headroom for text fields and multipart framing on top of the file payload.
const FIELD_HEADROOM_BYTES: u64 = 1024 * 1024;

impl UploadConfig {
    /// Returns true if `content_type` is one of the accepted types.
    ///
    /// Parameters such as `charset` are ignored and comparison is
    /// case-insensitive.
    pub fn allows(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }

    /// Upper bound for a whole request body.
    pub fn max_body_bytes(&self) -> usize {
        let files = self.max_file_size.saturating_mul(self.max_files as u64);
        usize::try_from(files.saturating_add(FIELD_HEADROOM_BYTES)).unwrap_or(usize::MAX)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            scratch_dir: "uploads".to_string(),
            field_name: "files[]".to_string(),
            max_files: 3,
            max_file_size: 10 * 1024 * 1024, // 10MB
            allowed_mime_types: vec![
                "application/pdf".to_string(),
                "application/msword".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "text/plain".to_string(),
            ],
            retain_in_local_mode: true,
        }
    }
}

/// Cross-origin policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the relay. `"*"` mirrors any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client inside one window.
    pub max_requests: u32,

    /// Sliding window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
        }
    }
}
