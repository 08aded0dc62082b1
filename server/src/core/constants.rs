// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Traceloom";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "traceloom";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name, looked up in the working directory by default
pub const CONFIG_FILE_NAME: &str = "traceloom.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACELOOM_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "TRACELOOM_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "TRACELOOM_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRACELOOM_LOG";

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "TRACELOOM_DEBUG";

/// Environment variable for the default per-stage deadline
pub const ENV_STAGE_TIMEOUT_MS: &str = "TRACELOOM_STAGE_TIMEOUT_MS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5377;

/// Default request body limit in bytes
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Graceful shutdown wait for background tasks in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Root span name for the checkout pipeline
pub const ROOT_SPAN_NAME: &str = "checkout";

/// Default per-stage deadline in milliseconds
pub const DEFAULT_STAGE_TIMEOUT_MS: u64 = 2_000;

/// Connect timeout for the shared downstream HTTP client in seconds
pub const DOWNSTREAM_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default stage names, in pipeline order
pub const STAGE_QUERY: &str = "query";
pub const STAGE_VALIDATION: &str = "validation";
pub const STAGE_QUEUE: &str = "queue";

/// Default collaborator endpoints for the checkout pipeline
pub const DEFAULT_QUERY_URL: &str = "http://127.0.0.1:7411/catalog/query";
pub const DEFAULT_VALIDATION_URL: &str = "http://127.0.0.1:7412/payment/validate";
pub const DEFAULT_QUEUE_URL: &str = "http://127.0.0.1:7413/cart/enqueue";
