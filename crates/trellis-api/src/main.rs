//! # trellis-api — Binary Entry Point
//!
//! Demo server with a `system` module (ping, info) and an in-memory `users`
//! module. Configuration comes from `TRELLIS_*` environment variables; the
//! command-line flags override them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use parking_lot::RwLock;
use serde_json::{json, Value};
use trellis_api::{create_module, create_module_with, App, HandlerResult, ModuleOptions, Reply, RequestContext};
use trellis_core::{ApiResponse, AppError, DatabaseAdapter, EnvConfig, FrameworkConfig, MockDatabase, Transaction};
use trellis_rules::rules::{default_value, email, length_between, max_length, min, optional_but, required};
use trellis_rules::{schema, Schema};
use trellis_service::{Configurable, ServiceConfig};

/// Trellis demo API server.
#[derive(Parser, Debug)]
#[command(name = "trellis-api", version, about)]
struct Cli {
    /// Prefix of the configuration environment variables.
    #[arg(long, default_value = "TRELLIS_")]
    env_prefix: String,
    /// Bind address.
    #[arg(long)]
    host: Option<String>,
    /// Bind port.
    #[arg(long)]
    port: Option<u16>,
    /// Prefix every module is mounted under.
    #[arg(long)]
    api_prefix: Option<String>,
}

impl Cli {
    fn config(&self) -> anyhow::Result<FrameworkConfig> {
        let mut config = FrameworkConfig::from_provider(&EnvConfig::with_prefix(self.env_prefix.as_str()))?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(prefix) = &self.api_prefix {
            config.api_prefix = trellis_core::config::normalize_prefix(prefix);
        }
        Ok(config)
    }
}

// ── System ──────────────────────────────────────────────────────────

struct SystemController {
    started: Instant,
}

impl SystemController {
    async fn ping(self: Arc<Self>, _req: RequestContext) -> HandlerResult {
        Ok(json!({"pong": true}).into())
    }

    async fn info(self: Arc<Self>, _req: RequestContext) -> HandlerResult {
        let info = json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": self.started.elapsed().as_secs(),
        });
        Ok(ApiResponse::ok(info).with_message("Service information").into())
    }
}

// ── Users ───────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct UserService {
    users: Arc<RwLock<BTreeMap<u64, Value>>>,
    next_id: Arc<AtomicU64>,
    config: ServiceConfig,
}

impl Configurable for UserService {
    fn service_config(&self) -> &ServiceConfig {
        &self.config
    }

    fn service_config_mut(&mut self) -> &mut ServiceConfig {
        &mut self.config
    }
}

impl UserService {
    fn list(&self) -> Result<Option<Vec<Value>>, AppError> {
        self.config
            .run("list", || Ok(self.users.read().values().cloned().collect()))
    }

    fn find(&self, id: u64) -> Result<Option<Value>, AppError> {
        self.config.run("find", || self.lookup(id))
    }

    fn create(&self, input: Value) -> Result<Option<Value>, AppError> {
        self.config.run("create", || {
            let email = input.get("email").cloned().unwrap_or(Value::Null);
            // The duplicate check and the insert share one write guard.
            let mut users = self.users.write();
            if users.values().any(|user| user.get("email") == Some(&email)) {
                return Err(AppError::Conflict(format!("Email {email} is already registered")));
            }
            let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            let user = with_id(id, input);
            users.insert(id, user.clone());
            drop(users);
            if let Some(tx) = self.transaction() {
                tracing::debug!(user = id, transaction = tx.id(), "user created in transaction");
            }
            Ok(user)
        })
    }

    fn update(&self, id: u64, changes: Value) -> Result<Option<Value>, AppError> {
        self.config.run("update", || {
            let mut user = self.lookup(id)?;
            if let (Some(target), Value::Object(changes)) = (user.as_object_mut(), changes) {
                target.extend(changes);
            }
            Ok(self.store(id, user))
        })
    }

    fn remove(&self, id: u64) -> Result<Option<()>, AppError> {
        self.config.run("remove", || {
            self.users
                .write()
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
        })
    }

    fn lookup(&self, id: u64) -> Result<Value, AppError> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
    }

    fn store(&self, id: u64, user: Value) -> Value {
        let user = with_id(id, user);
        self.users.write().insert(id, user.clone());
        user
    }
}

fn with_id(id: u64, mut user: Value) -> Value {
    if let Some(fields) = user.as_object_mut() {
        fields.insert("id".to_string(), json!(id));
    }
    user
}

struct UserController {
    users: UserService,
    db: MockDatabase,
    create: Schema,
    update: Schema,
}

impl UserController {
    fn new() -> Self {
        let create = schema! {
            "name" => [required(), length_between(2, 64)],
            "email" => [required(), email()],
            "age" => optional_but([min(0.0)]),
            "role" => default_value("member"),
        };
        let update = create.extend([
            ("name", optional_but([length_between(2, 64)])),
            ("email", optional_but([email()])),
            ("role", optional_but([max_length(32)])),
        ]);
        Self {
            users: UserService::default(),
            db: MockDatabase::new(),
            create,
            update,
        }
    }

    async fn list(self: Arc<Self>, _req: RequestContext) -> HandlerResult {
        Ok(self.users.list()?.map(Value::from).into())
    }

    async fn show(self: Arc<Self>, req: RequestContext) -> HandlerResult {
        let id: u64 = req.param_as("id")?;
        Ok(self.users.find(id)?.into())
    }

    async fn exists(self: Arc<Self>, req: RequestContext) -> HandlerResult {
        let id: u64 = req.param_as("id")?;
        let found = self.users.silent().find(id)?.is_some();
        Ok(json!({"exists": found}).into())
    }

    async fn create(self: Arc<Self>, req: RequestContext) -> HandlerResult {
        self.create.check(req.body())?;
        let input = self.create.pick(req.body());

        let tx = self.db.begin().await?;
        let created = match self.users.with_transaction(Arc::clone(&tx)).create(input) {
            Ok(user) => user,
            Err(err) => {
                tx.rollback().await?;
                return Err(err.into());
            }
        };
        tx.commit().await?;
        Ok(created.map(ApiResponse::created).into())
    }

    async fn update(self: Arc<Self>, req: RequestContext) -> HandlerResult {
        let id: u64 = req.param_as("id")?;
        self.update.check(req.body())?;
        let changes = self.update.pick(req.body());
        Ok(self.users.update(id, changes)?.into())
    }

    async fn remove(self: Arc<Self>, req: RequestContext) -> HandlerResult {
        let id: u64 = req.param_as("id")?;
        self.users.remove(id)?;
        Ok(Reply::Empty)
    }
}

fn app(config: FrameworkConfig) -> App {
    let system = create_module_with(
        "/system",
        SystemController { started: Instant::now() },
        ModuleOptions {
            name: Some("System".into()),
            description: Some("Liveness and build information".into()),
            ..ModuleOptions::default()
        },
        |r| vec![r.get("/ping", SystemController::ping), r.get("/info", SystemController::info)],
    );
    let users = create_module("/users", UserController::new(), |r| {
        vec![
            r.get("/", UserController::list),
            r.post("/", UserController::create),
            r.get("/{id}", UserController::show),
            r.get("/{id}/exists", UserController::exists),
            r.patch("/{id}", UserController::update),
            r.delete("/{id}", UserController::remove),
        ]
    })
    .name("Users")
    .description("In-memory user directory");

    App::new(config).modules([system, users])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;
    trellis_api::telemetry::init(config.log_format)?;

    let app = app(config);
    for (method, path, handler) in trellis_api::route_table(&app) {
        tracing::debug!(%method, %path, handler, "route");
    }
    app.serve().await
}
