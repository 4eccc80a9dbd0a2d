#![allow(dead_code)]
use jsonwebtoken::{EncodingKey, Header, encode};
use letterbox_server::AppBuilder;
use letterbox_server::api::{MgmtState, app_router, mgmt_router};
use letterbox_server::api::middleware::GatewayClaims;
use letterbox_server::config::{
    Config, CorsConfig, CredentialConfig, DatabaseConfig, GatewayConfig, HealthConfig, LogFormat, ServerConfig,
    StorageConfig, TelemetryConfig,
};
use letterbox_server::adapters::database::{self, DbPool};
use serde_json::{Value, json};
use std::sync::Once;
use tokio::net::TcpListener;

static INIT: Once = Once::new();

pub const GATEWAY_SECRET: &str = "test_gateway_secret";
pub const GATEWAY_HEADER: &str = "x-gateway-jwt";

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("letterbox_server=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

/// Connects to `DATABASE_URL` and applies migrations.
///
/// Returns `None` when the variable is unset so Postgres-backed tests can be
/// skipped on machines without a database.
pub async fn get_test_pool() -> Option<DbPool> {
    setup_tracing();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres-backed test");
        return None;
    };

    let pool = database::init_pool(&get_test_config().database, &database_url)
        .await
        .expect("Failed to connect to DB. Is Postgres running?");
    database::run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

/// Unique suffix so tests sharing one database never collide.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

pub fn get_test_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 60,
            max_lifetime_secs: 600,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            mgmt_port: 0,
            shutdown_timeout_secs: 1,
            request_timeout_secs: 30,
        },
        gateway: GatewayConfig { jwt_secret: GATEWAY_SECRET.to_string(), jwt_header: GATEWAY_HEADER.to_string() },
        credentials: CredentialConfig { memory_kib: 1024, iterations: 1, parallelism: 1 },
        storage: StorageConfig {
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
            image_max_size_bytes: 1024,
        },
        cors: CorsConfig { allowed_origins: vec!["http://localhost:3000".to_string()] },
        telemetry: TelemetryConfig { otlp_endpoint: None, log_format: LogFormat::Text },
        health: HealthConfig { db_timeout_ms: 500, storage_timeout_ms: 500 },
    }
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub config: Config,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        let builder = AppBuilder::new(config.clone());
        Self::spawn_with_builder(config, builder).await
    }

    /// Spawns the app against Postgres, or returns `None` without a database.
    pub async fn spawn_with_database() -> Option<Self> {
        let pool = get_test_pool().await?;
        let config = get_test_config();
        let builder = AppBuilder::new(config.clone()).with_database(pool);
        Some(Self::spawn_with_builder(config, builder).await)
    }

    pub async fn spawn_with_builder(config: Config, builder: AppBuilder) -> Self {
        setup_tracing();
        let services = builder.build().unwrap();
        let health_service = services.health_service.clone();

        let app = app_router(config.clone(), services);
        let mgmt_app = mgmt_router(MgmtState { health_service });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_app).await.unwrap();
        });

        Self { server_url, mgmt_url, client: reqwest::Client::new(), config }
    }

    /// Mints a gateway token entitled to `projects`.
    pub fn admin_token(&self, projects: &[&str]) -> String {
        let exp = time::OffsetDateTime::now_utc().unix_timestamp() + 3600;
        let claims = GatewayClaims {
            sub: "test-operator".to_string(),
            projects: projects.iter().map(ToString::to_string).collect(),
            exp: usize::try_from(exp).unwrap(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(GATEWAY_SECRET.as_bytes())).unwrap()
    }

    /// Creates a message through the admin API and returns the response body.
    pub async fn create_message(&self, project_id: &str, body: Value) -> Value {
        let resp = self
            .client
            .post(format!("{}/admin/message/{project_id}", self.server_url))
            .header(GATEWAY_HEADER, self.admin_token(&[project_id]))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        resp.json().await.unwrap()
    }

    pub async fn create_protected(&self, project_id: &str, id: &str, password: &str) -> Value {
        self.create_message(
            project_id,
            json!({"messageId": id, "content": {"text": "secret"}, "initialPassword": password, "hint": "pet"}),
        )
        .await
    }

    pub async fn create_open(&self, project_id: &str, id: &str) -> Value {
        self.create_message(project_id, json!({"messageId": id, "content": {"text": "hello"}})).await
    }

    pub async fn read(&self, id: &str, password: Option<&str>) -> reqwest::Response {
        let body = password.map_or_else(|| json!({}), |p| json!({"password": p}));
        self.client.post(format!("{}/message/{id}", self.server_url)).json(&body).send().await.unwrap()
    }
}
