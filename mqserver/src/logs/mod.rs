//! Logs du serveur : buffer circulaire, diffusion SSE et niveau rechargeable
mod sselayer;

pub use sselayer::SseLayer;

use std::{
    collections::VecDeque,
    sync::{Arc, PoisonError, RwLock},
};

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::{DateTime, Utc};
use mqconfig::get_config;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const AVAILABLE_LEVELS: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Représente une entrée de log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Buffer circulaire partagé
#[derive(Clone)]
pub struct LogState {
    buffer: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
    max_level: Arc<RwLock<Level>>,
    reload_handle: reload::Handle<LevelFilter, Registry>,
}

impl LogState {
    pub fn new(capacity: usize, reload_handle: reload::Handle<LevelFilter, Registry>) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            tx: broadcast::channel(1000).0,
            max_level: Arc::new(RwLock::new(Level::TRACE)),
            reload_handle,
        }
    }

    /// Change le niveau maximum et recharge le filtre du subscriber
    pub fn set_max_level(&self, level: Level) -> Result<()> {
        *self
            .max_level
            .write()
            .unwrap_or_else(PoisonError::into_inner) = level;

        self.reload_handle
            .reload(LevelFilter::from_level(level))
            .context("Failed to reload log level filter")
    }

    pub fn get_max_level(&self) -> Level {
        *self
            .max_level
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, entry: LogEntry) {
        let mut buf = self.buffer.write().unwrap_or_else(PoisonError::into_inner);
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry.clone());
        let _ = self.tx.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn dump(&self) -> Vec<LogEntry> {
        self.buffer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Query params pour /log-sse
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub warn: Option<bool>,
    #[serde(default)]
    pub info: Option<bool>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub trace: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Handler SSE : l'historique filtré, puis les nouvelles entrées
pub async fn log_sse(
    State(state): State<LogState>,
    Query(params): Query<LogQuery>,
) -> impl IntoResponse {
    let mut rx = state.subscribe();
    let history = state.dump();

    let stream = async_stream::stream! {
        let current_level = state.get_max_level();
        for entry in history {
            if is_level_allowed(&entry.level, current_level) && filter_entry(&entry, &params) {
                yield Event::default().json_data(&entry);
            }
        }

        loop {
            match rx.recv().await {
                Ok(entry) => {
                    if is_level_allowed(&entry.level, state.get_max_level())
                        && filter_entry(&entry, &params)
                    {
                        yield Event::default().json_data(&entry);
                    }
                }
                // Client trop lent : on saute les entrées perdues
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handler REST (dump JSON du buffer)
pub async fn log_dump(State(state): State<LogState>) -> impl IntoResponse {
    Json(state.dump())
}

/// Un log est autorisé si son niveau n'est pas plus verbeux que `max_level`
fn is_level_allowed(log_level: &str, max_level: Level) -> bool {
    match log_level.parse::<Level>() {
        Ok(level) => level <= max_level,
        Err(_) => false,
    }
}

/// Filtrage par drapeaux de niveau et par mot-clé
fn filter_entry(entry: &LogEntry, q: &LogQuery) -> bool {
    let lvl = entry.level.to_lowercase();
    let flags = [
        (q.error, "error"),
        (q.warn, "warn"),
        (q.info, "info"),
        (q.debug, "debug"),
        (q.trace, "trace"),
    ];

    let any_flag = flags.iter().any(|(flag, _)| flag.unwrap_or(false));
    let mut allowed = !any_flag
        || flags
            .iter()
            .any(|(flag, name)| flag.unwrap_or(false) && lvl == *name);

    if let Some(search) = &q.search {
        allowed &= entry.message.contains(search) || entry.target.contains(search);
    }

    allowed
}

/// Options d'initialisation du système de logging
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Capacité du buffer circulaire (nombre d'entrées conservées)
    pub buffer_capacity: usize,
    /// Activer la sortie vers la console
    pub enable_console: bool,
    /// Niveau minimum émis (ERROR, WARN, INFO, DEBUG, TRACE)
    pub min_level: Level,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            enable_console: true,
            min_level: Level::INFO,
        }
    }
}

impl LoggingOptions {
    /// Lit les options depuis `host.logger.*`, valeur par défaut sinon
    pub fn from_config() -> Self {
        let config = get_config();
        let defaults = Self::default();

        Self {
            buffer_capacity: config
                .get_log_cache_size()
                .unwrap_or(defaults.buffer_capacity),
            enable_console: config
                .get_log_enable_console()
                .unwrap_or(defaults.enable_console),
            min_level: config
                .get_log_min_level()
                .ok()
                .and_then(|l| l.parse::<Level>().ok())
                .unwrap_or(defaults.min_level),
        }
    }
}

/// Initialise le subscriber global : filtre rechargeable, buffer SSE et
/// console optionnelle.
///
/// Le filtre est placé avant le `SseLayer` pour que le buffer ne garde que
/// les entrées émises.
///
/// ```rust,no_run
/// use mqserver::logs::{init_logging, LoggingOptions};
///
/// let log_state = init_logging(LoggingOptions::from_config())?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logging(options: LoggingOptions) -> Result<LogState> {
    let (filter, reload_handle) = reload::Layer::new(LevelFilter::from_level(options.min_level));

    let log_state = LogState::new(options.buffer_capacity, reload_handle);
    *log_state
        .max_level
        .write()
        .unwrap_or_else(PoisonError::into_inner) = options.min_level;

    let subscriber = Registry::default()
        .with(filter)
        .with(SseLayer::new(log_state.clone()));

    let console = options.enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    });

    subscriber
        .with(console)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(log_state)
}

/// Request body pour la configuration du logging
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LogSetupRequest {
    pub level: String,
}

/// Response pour la configuration du logging
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogSetupResponse {
    pub current_level: String,
    pub available_levels: Vec<String>,
}

impl LogSetupResponse {
    fn new(level: Level) -> Self {
        Self {
            current_level: level.as_str().to_string(),
            available_levels: AVAILABLE_LEVELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Handler pour GET /api/log_setup - retourne la configuration actuelle
#[utoipa::path(
    get,
    path = "/api/log_setup",
    responses(
        (status = 200, description = "Log configuration retrieved successfully", body = LogSetupResponse)
    ),
    tag = "logs"
)]
pub async fn log_setup_get(State(state): State<LogState>) -> impl IntoResponse {
    Json(LogSetupResponse::new(state.get_max_level()))
}

/// Handler pour POST /api/log_setup - met à jour le niveau de log
#[utoipa::path(
    post,
    path = "/api/log_setup",
    request_body = LogSetupRequest,
    responses(
        (status = 200, description = "Log level updated successfully", body = LogSetupResponse),
        (status = 400, description = "Invalid log level")
    ),
    tag = "logs"
)]
pub async fn log_setup_post(
    State(state): State<LogState>,
    Json(payload): Json<LogSetupRequest>,
) -> impl IntoResponse {
    let level = match AVAILABLE_LEVELS
        .iter()
        .find(|l| l.eq_ignore_ascii_case(payload.level.trim()))
        .and_then(|l| l.parse::<Level>().ok())
    {
        Some(l) => l,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Invalid log level. Must be one of: ERROR, WARN, INFO, DEBUG, TRACE"
                })),
            )
                .into_response();
        }
    };

    if let Err(e) = state.set_max_level(level) {
        tracing::warn!("{:#}", e);
    }
    tracing::info!("Log level changed to: {}", level);

    (StatusCode::OK, Json(LogSetupResponse::new(level))).into_response()
}

/// Crée le router pour l'API de gestion des logs
pub fn create_logs_router(log_state: LogState) -> axum::Router {
    use axum::routing::get;
    axum::Router::new()
        .route("/api/log_setup", get(log_setup_get).post(log_setup_post))
        .with_state(log_state)
}

/// API OpenAPI pour la gestion des logs
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(log_setup_get, log_setup_post),
    components(schemas(LogSetupRequest, LogSetupResponse)),
    tags(
        (name = "logs", description = "Log level configuration endpoints")
    )
)]
pub struct LogsApiDoc;
