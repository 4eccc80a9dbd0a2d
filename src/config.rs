use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub gateway: GatewayConfig,

    #[command(flatten)]
    pub credentials: CredentialConfig,

    #[command(flatten)]
    pub storage: StorageConfig,

    #[command(flatten)]
    pub cors: CorsConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,

    #[command(flatten)]
    pub health: HealthConfig,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL. When unset, messages are kept in memory.
    #[arg(long = "database-url", env = "LETTERBOX_DATABASE_URL")]
    pub url: Option<String>,

    /// Maximum number of pooled connections
    #[arg(long, env = "LETTERBOX_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    #[arg(long, env = "LETTERBOX_DB_MIN_CONNECTIONS", default_value_t = 2)]
    pub min_connections: u32,

    /// How long to wait for a free connection before failing
    #[arg(long, env = "LETTERBOX_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    #[arg(long, env = "LETTERBOX_DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    #[arg(long, env = "LETTERBOX_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "LETTERBOX_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "LETTERBOX_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management (health) listener
    #[arg(long, env = "LETTERBOX_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// How long to wait for in-flight work during shutdown
    #[arg(long, env = "LETTERBOX_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Upper bound on a single request
    #[arg(long, env = "LETTERBOX_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct GatewayConfig {
    /// Shared secret the internal gateway signs its JWTs with
    #[arg(long = "gateway-jwt-secret", env = "LETTERBOX_GATEWAY_JWT_SECRET")]
    pub jwt_secret: String,

    /// Header carrying the gateway JWT
    #[arg(long = "gateway-jwt-header", env = "LETTERBOX_GATEWAY_JWT_HEADER", default_value = "x-gateway-jwt")]
    pub jwt_header: String,
}

#[derive(Clone, Debug, Args)]
pub struct CredentialConfig {
    /// Argon2id memory cost in KiB
    #[arg(long = "argon2-memory-kib", env = "LETTERBOX_ARGON2_MEMORY_KIB", default_value_t = 19_456)]
    pub memory_kib: u32,

    /// Argon2id iteration count
    #[arg(long = "argon2-iterations", env = "LETTERBOX_ARGON2_ITERATIONS", default_value_t = 2)]
    pub iterations: u32,

    /// Argon2id degree of parallelism
    #[arg(long = "argon2-parallelism", env = "LETTERBOX_ARGON2_PARALLELISM", default_value_t = 1)]
    pub parallelism: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self { memory_kib: 19_456, iterations: 2, parallelism: 1 }
    }
}

#[derive(Clone, Debug, Args)]
pub struct StorageConfig {
    /// S3 bucket for message images. When unset, images are kept in memory.
    #[arg(long = "storage-bucket", env = "LETTERBOX_STORAGE_BUCKET")]
    pub bucket: Option<String>,

    /// S3 region
    #[arg(long = "storage-region", env = "LETTERBOX_STORAGE_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3 endpoint (useful for MinIO)
    #[arg(long = "storage-endpoint", env = "LETTERBOX_STORAGE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// S3 access key
    #[arg(long = "storage-access-key", env = "LETTERBOX_STORAGE_ACCESS_KEY")]
    pub access_key: Option<String>,

    /// S3 secret key
    #[arg(long = "storage-secret-key", env = "LETTERBOX_STORAGE_SECRET_KEY")]
    pub secret_key: Option<String>,

    /// Force path style (required for many MinIO setups: http://host/bucket/key)
    #[arg(long = "storage-force-path-style", env = "LETTERBOX_STORAGE_FORCE_PATH_STYLE", default_value_t = false)]
    pub force_path_style: bool,

    /// Max image size in bytes (Default: 10MB)
    #[arg(long, env = "LETTERBOX_IMAGE_MAX_SIZE_BYTES", default_value_t = 10_485_760)]
    pub image_max_size_bytes: usize,
}

#[derive(Clone, Debug, Args)]
pub struct CorsConfig {
    /// Comma-separated list of origins allowed to call the API from a browser
    #[arg(
        long = "cors-allowed-origins",
        env = "LETTERBOX_CORS_ALLOWED_ORIGINS",
        default_value = "http://localhost:3000",
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint. Export is disabled when unset.
    #[arg(long, env = "LETTERBOX_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "LETTERBOX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    #[arg(long, env = "LETTERBOX_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub db_timeout_ms: u64,

    #[arg(long, env = "LETTERBOX_HEALTH_STORAGE_TIMEOUT_MS", default_value_t = 2000)]
    pub storage_timeout_ms: u64,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
