use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use drowsiness_core::{EyeIndexTable, EyeLandmarkIndices, TrackerConfig};

use crate::constants::{
    DEFAULT_DETECTOR_TIMEOUT_SECS, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_SESSIONS,
    DEFAULT_MAX_SSE_CONNECTIONS, DEFAULT_SESSION_IDLE_TTL_SECS,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// JSON lines on stdout instead of human-readable text.
    pub log_json: bool,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub trust_proxy: bool,
    pub static_dir: String,
    pub rate_limit: RateLimitConfig,
    pub detection: DetectionConfig,
    pub detector: DetectorConfig,
    pub sessions: SessionConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u64,
}

/// Thresholds and landmark schema, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionConfig {
    pub tracker: TrackerConfig,
    pub eye_indices: EyeIndexTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorMode {
    Disabled,
    Remote,
}

impl DetectorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Remote => "remote",
        }
    }
}

impl FromStr for DetectorMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "remote" | "http" => Ok(Self::Remote),
            other => Err(format!("unknown detector mode '{other}'")),
        }
    }
}

#[derive(Clone)]
pub struct DetectorConfig {
    pub mode: DetectorMode,
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_ttl_secs: u64,
    pub max_sessions: usize,
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 600,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: DEFAULT_SESSION_IDLE_TTL_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            cleanup_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_body_bytes: usize,
    pub max_sse_connections: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_sse_connections: DEFAULT_MAX_SSE_CONNECTIONS,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: DetectorMode::Disabled,
            url: String::new(),
            api_key: String::new(),
            timeout_secs: DEFAULT_DETECTOR_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorConfig")
            .field("mode", &self.mode)
            .field("url", &self.url)
            .field("api_key", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Built-in values, used for every variable missing from the environment.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5000,
            log_level: "info".to_string(),
            log_json: false,
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
            cors_origin: "http://localhost:5000".to_string(),
            trust_proxy: false,
            static_dir: "./static".to_string(),
            rate_limit: RateLimitConfig::default(),
            detection: DetectionConfig::default(),
            detector: DetectorConfig::default(),
            sessions: SessionConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();

        let consec_frames = env_or_parse("CONSEC_FRAMES", d.detection.tracker.consec_frames);
        let consec_frames = if consec_frames == 0 {
            tracing::warn!("CONSEC_FRAMES must be at least 1, using 1");
            1
        } else {
            consec_frames
        };

        Self {
            host: env_or_parse("HOST", d.host),
            port: env_or_parse("PORT", d.port),
            log_level: env_or("RUST_LOG", &d.log_level),
            log_json: env_or_bool("LOG_JSON", d.log_json),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", d.enable_file_logs),
            log_dir: env_or("LOG_DIR", &d.log_dir),
            cors_origin: env_or("CORS_ORIGIN", &d.cors_origin),
            trust_proxy: env_or_bool("TRUST_PROXY", d.trust_proxy),
            static_dir: env_or("STATIC_DIR", &d.static_dir),
            rate_limit: RateLimitConfig {
                window_secs: env_or_parse("RATE_LIMIT_WINDOW_SECS", d.rate_limit.window_secs),
                max_requests: env_or_parse("RATE_LIMIT_MAX", d.rate_limit.max_requests),
            },
            detection: DetectionConfig {
                tracker: TrackerConfig {
                    ear_threshold: env_or_parse(
                        "EAR_THRESHOLD",
                        d.detection.tracker.ear_threshold,
                    ),
                    consec_frames,
                },
                eye_indices: EyeIndexTable {
                    left: env_or_indices("LEFT_EYE_LANDMARKS", d.detection.eye_indices.left),
                    right: env_or_indices("RIGHT_EYE_LANDMARKS", d.detection.eye_indices.right),
                },
            },
            detector: DetectorConfig {
                mode: env_or_parse_str("DETECTOR_MODE", d.detector.mode),
                url: env_or("DETECTOR_URL", &d.detector.url),
                api_key: env_or("DETECTOR_API_KEY", &d.detector.api_key),
                timeout_secs: env_or_parse("DETECTOR_TIMEOUT_SECS", d.detector.timeout_secs),
            },
            sessions: SessionConfig {
                idle_ttl_secs: env_or_parse("SESSION_IDLE_TTL_SECS", d.sessions.idle_ttl_secs),
                max_sessions: env_or_parse("MAX_SESSIONS", d.sessions.max_sessions),
                cleanup_interval_secs: env_or_parse(
                    "SESSION_CLEANUP_INTERVAL_SECS",
                    d.sessions.cleanup_interval_secs,
                ),
            },
            limits: LimitsConfig {
                max_body_bytes: env_or_parse("MAX_BODY_BYTES", d.limits.max_body_bytes),
                max_sse_connections: env_or_parse(
                    "MAX_SSE_CONNECTIONS",
                    d.limits.max_sse_connections,
                ),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn env_or_parse_str<T>(key: &str, default: T) -> T
where
    T: FromStr<Err = String>,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Invalid env var, using default");
            default
        }),
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Reads a comma-separated list of exactly six landmark indices.
pub fn env_or_indices(key: &str, default: EyeLandmarkIndices) -> EyeLandmarkIndices {
    match env::var(key) {
        Ok(raw) => parse_indices(&raw).unwrap_or_else(|| {
            tracing::warn!(
                key,
                value = %raw,
                "Expected six comma-separated landmark indices, using default"
            );
            default
        }),
        Err(_) => default,
    }
}

fn parse_indices(raw: &str) -> Option<EyeLandmarkIndices> {
    let parsed: Vec<usize> = raw
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .ok()?;
    parsed.try_into().ok()
}
