pub use drowsiness_core::tracker::{DEFAULT_CONSEC_FRAMES, DEFAULT_EAR_THRESHOLD};

/// Session used when the caller supplies no session id
pub const DEFAULT_SESSION_ID: &str = "default";

/// Header carrying the session id on requests and responses
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Message attached to a frame in which no face was found
pub const NO_FACE_MESSAGE: &str = "no_face";

/// Sessions idle longer than this are dropped (seconds)
pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 600;

/// Upper bound on tracked sessions; the least recently seen one is evicted
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Request body limit; a 640x480 JPEG data URL is well under 1 MiB
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub const DEFAULT_MAX_SSE_CONNECTIONS: usize = 64;

pub const DEFAULT_DETECTOR_TIMEOUT_SECS: u64 = 10;

/// Capacity of the frame event broadcast channel
pub const FRAME_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Maximum accepted length of a session or request id
pub const MAX_ID_LEN: usize = 128;
