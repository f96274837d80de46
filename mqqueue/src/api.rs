//! API REST des files partagées
//!
//! Routes exposées :
//! - `GET /queue` : contenu d'une file
//! - `POST /queue/create` : création (ou récupération) par nom
//! - `POST /queue/add` : ajout d'un morceau
//! - `POST /queue/remove` : retrait d'un morceau
//! - `GET /queue/stream` : flux SSE (voir [`crate::sse`])
//!
//! Une file est désignée par `queue_id`, `code` ou `queue` (nom), dans cet
//! ordre de priorité.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::error::Error;
use crate::manager::QueueManager;
use crate::queue::{NewEntry, Queue, QueueEntry, QueueRef};

/// Crée le router Axum des files
pub fn create_router(manager: QueueManager) -> Router {
    Router::new()
        .route("/queue", get(get_queue))
        .route("/queue/create", post(create_queue))
        .route("/queue/add", post(add_to_queue))
        .route("/queue/remove", post(remove_from_queue))
        .route("/queue/stream", get(crate::sse::queue_stream))
        .with_state(manager)
}

/// Identifiant reçu en JSON, sous forme de nombre ou de chaîne
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    fn as_text(&self) -> Option<String> {
        match self {
            IdValue::Number(n) => Some(n.to_string()),
            IdValue::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        }
    }
}

/// Interprète un identifiant numérique ; vide ou absent vaut `None`
fn parse_id(value: Option<&IdValue>, field: &str) -> Result<Option<i64>, Error> {
    let Some(text) = value.and_then(IdValue::as_text) else {
        return Ok(None);
    };
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| Error::Validation(format!("Invalid {}.", field)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn queue_ref(
    queue_id: Option<&IdValue>,
    code: Option<String>,
    queue: Option<String>,
) -> Result<QueueRef, Error> {
    Ok(QueueRef {
        id: parse_id(queue_id, "queue_id")?,
        code: non_empty(code),
        name: non_empty(queue),
    })
}

/// Sélection d'une file dans la query string
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct QueueParams {
    /// Identifiant numérique de la file
    pub queue_id: Option<String>,
    /// Code de partage (insensible à la casse)
    pub code: Option<String>,
    /// Nom de la file, créée si elle n'existe pas
    pub queue: Option<String>,
}

impl QueueParams {
    pub(crate) fn queue_ref(self) -> Result<QueueRef, Error> {
        let id = self.queue_id.map(IdValue::Text);
        queue_ref(id.as_ref(), self.code, self.queue)
    }
}

/// Morceau tel que renvoyé aux clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueueEntryView {
    /// Identifiant catalogue du morceau
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<String>,
    /// Identifiant de l'entrée dans la file
    pub queued_id: i64,
    /// Date d'ajout, RFC 3339 UTC
    pub created_at: String,
    pub queue_id: i64,
}

impl From<&QueueEntry> for QueueEntryView {
    fn from(entry: &QueueEntry) -> Self {
        let created_at: DateTime<Utc> = entry.created_at.into();
        Self {
            id: entry.track_id.clone(),
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone(),
            cover: entry.cover.clone(),
            queued_id: entry.id,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            queue_id: entry.queue_id,
        }
    }
}

pub(crate) fn views(entries: &[QueueEntry]) -> Vec<QueueEntryView> {
    entries.iter().map(QueueEntryView::from).collect()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueueResponse {
    pub items: Vec<QueueEntryView>,
    pub queue_id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQueueRequest {
    pub name: Option<String>,
}

/// File créée ou retrouvée ; `id` reprend `queue_id`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateQueueResponse {
    pub id: i64,
    pub queue_id: i64,
    pub code: String,
    pub name: String,
}

impl From<Queue> for CreateQueueResponse {
    fn from(queue: Queue) -> Self {
        Self {
            id: queue.id,
            queue_id: queue.id,
            code: queue.code,
            name: queue.name,
        }
    }
}

/// Ajout d'un morceau ; `track_id` prime sur `id`
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddRequest {
    #[schema(value_type = Option<i64>)]
    pub queue_id: Option<IdValue>,
    pub code: Option<String>,
    pub queue: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    #[schema(value_type = Option<String>)]
    pub id: Option<IdValue>,
    #[schema(value_type = Option<String>)]
    pub track_id: Option<IdValue>,
    pub album: Option<String>,
    pub cover: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddResponse {
    pub item: QueueEntryView,
    pub queue_id: i64,
}

/// Retrait par `queued_id`, à défaut par `track_id` (entrée la plus ancienne)
#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveRequest {
    #[schema(value_type = Option<i64>)]
    pub queue_id: Option<IdValue>,
    pub code: Option<String>,
    pub queue: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub queued_id: Option<IdValue>,
    #[schema(value_type = Option<String>)]
    pub track_id: Option<IdValue>,
}

enum Removal {
    Entry(i64),
    Track(String),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemoveResponse {
    pub ok: bool,
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[utoipa::path(
    get,
    path = "/queue",
    tag = "queue",
    params(QueueParams),
    responses(
        (status = 200, description = "Contenu de la file", body = QueueResponse),
        (status = 400, description = "Référence invalide", body = ErrorResponse),
        (status = 404, description = "File inconnue", body = ErrorResponse)
    )
)]
pub async fn get_queue(
    State(manager): State<QueueManager>,
    Query(params): Query<QueueParams>,
) -> Response {
    let result = async move {
        let queue = manager.resolve(&params.queue_ref()?).await?;
        let items = manager.list(&queue)?;
        Ok::<_, Error>(QueueResponse {
            items: views(&items),
            queue_id: queue.id,
            code: queue.code,
            name: queue.name,
        })
    }
    .await;

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/queue/create",
    tag = "queue",
    request_body = CreateQueueRequest,
    responses(
        (status = 200, description = "File créée ou existante", body = CreateQueueResponse),
        (status = 400, description = "Nom invalide", body = ErrorResponse)
    )
)]
pub async fn create_queue(
    State(manager): State<QueueManager>,
    body: Result<Json<CreateQueueRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return map_rejection(rejection),
    };

    match manager.create_queue(req.name.as_deref()).await {
        Ok(queue) => (StatusCode::OK, Json(CreateQueueResponse::from(queue))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/queue/add",
    tag = "queue",
    request_body = AddRequest,
    responses(
        (status = 201, description = "Morceau ajouté", body = AddResponse),
        (status = 400, description = "Titre ou artiste manquant", body = ErrorResponse),
        (status = 404, description = "File inconnue", body = ErrorResponse)
    )
)]
pub async fn add_to_queue(
    State(manager): State<QueueManager>,
    body: Result<Json<AddRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return map_rejection(rejection),
    };

    let result = async move {
        let entry = NewEntry {
            track_id: req
                .track_id
                .as_ref()
                .and_then(IdValue::as_text)
                .or_else(|| req.id.as_ref().and_then(IdValue::as_text)),
            title: req.title.unwrap_or_default(),
            artist: req.artist.unwrap_or_default(),
            album: req.album,
            cover: req.cover,
        }
        .validate()?;

        let target = queue_ref(req.queue_id.as_ref(), req.code, req.queue)?;
        let queue = manager.resolve(&target).await?;
        manager.add(&queue, entry).await
    }
    .await;

    match result {
        Ok(entry) => (
            StatusCode::CREATED,
            Json(AddResponse {
                queue_id: entry.queue_id,
                item: QueueEntryView::from(&entry),
            }),
        )
            .into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/queue/remove",
    tag = "queue",
    request_body = RemoveRequest,
    responses(
        (status = 200, description = "Morceau retiré", body = RemoveResponse),
        (status = 400, description = "Ni queued_id ni track_id", body = ErrorResponse),
        (status = 404, description = "File ou morceau inconnu", body = ErrorResponse)
    )
)]
pub async fn remove_from_queue(
    State(manager): State<QueueManager>,
    body: Result<Json<RemoveRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return map_rejection(rejection),
    };

    let result = async move {
        let queued_id = parse_id(req.queued_id.as_ref(), "queued_id")?;
        let track_id = req.track_id.as_ref().and_then(IdValue::as_text);
        let removal = match (queued_id, track_id) {
            (Some(id), _) => Removal::Entry(id),
            (None, Some(track_id)) => Removal::Track(track_id),
            (None, None) => {
                return Err(Error::Validation(
                    "queued_id or track_id is required.".to_string(),
                ));
            }
        };

        let target = queue_ref(req.queue_id.as_ref(), req.code, req.queue)?;
        let queue = manager.resolve(&target).await?;
        match removal {
            Removal::Entry(id) => manager.remove(&queue, id).await,
            Removal::Track(track_id) => manager.remove_by_track(&queue, &track_id).await,
        }
    }
    .await;

    match result {
        Ok(_) => (StatusCode::OK, Json(RemoveResponse { ok: true })).into_response(),
        Err(err) => map_error(err),
    }
}

pub(crate) fn map_error(error: Error) -> Response {
    let (status, message) = match &error {
        Error::Validation(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        Error::QueueNotFound(_) | Error::EntryNotFound(_) => {
            (StatusCode::NOT_FOUND, error.to_string())
        }
        _ => {
            error!("Queue operation failed: {}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected server error.".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}

fn map_rejection(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: format!("Invalid JSON body: {}", rejection.body_text()),
        }),
    )
        .into_response()
}

/// Documentation OpenAPI pour l'API des files
#[derive(OpenApi)]
#[openapi(
    paths(
        get_queue,
        create_queue,
        add_to_queue,
        remove_from_queue,
        crate::sse::queue_stream
    ),
    components(schemas(
        QueueEntryView,
        QueueResponse,
        CreateQueueRequest,
        CreateQueueResponse,
        AddRequest,
        AddResponse,
        RemoveRequest,
        RemoveResponse,
        ErrorResponse,
        crate::sse::StreamMessage
    )),
    tags(
        (name = "queue", description = "Files d'écoute partagées")
    )
)]
pub struct QueueApiDoc;
