//! SSE pour suivre une file en temps réel.
//!
//! Route type : `GET /queue/stream?code=AB12CD34`
//!
//! Le premier message (`init`) porte le contenu complet de la file ; chaque
//! mutation produit ensuite un message `add` ou `remove` avec le nouveau
//! contenu complet.

use async_stream::stream;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::api::{QueueEntryView, QueueParams, map_error, views};
use crate::broadcaster::{QueueChange, QueueEvent};
use crate::manager::QueueManager;

/// Message envoyé sur le flux, discriminé par `type`
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Init {
        queue_id: i64,
        code: String,
        name: String,
        items: Vec<QueueEntryView>,
    },
    Add {
        queue_id: i64,
        item: QueueEntryView,
        items: Vec<QueueEntryView>,
    },
    Remove {
        queue_id: i64,
        queued_id: i64,
        track_id: String,
        items: Vec<QueueEntryView>,
    },
}

impl From<QueueEvent> for StreamMessage {
    fn from(event: QueueEvent) -> Self {
        let items = views(&event.items);
        match event.change {
            QueueChange::Added(entry) => StreamMessage::Add {
                queue_id: event.queue_id,
                item: QueueEntryView::from(&entry),
                items,
            },
            QueueChange::Removed { entry_id, track_id } => StreamMessage::Remove {
                queue_id: event.queue_id,
                queued_id: entry_id,
                track_id,
                items,
            },
        }
    }
}

/// Handler SSE : état initial puis une mise à jour par mutation.
#[utoipa::path(
    get,
    path = "/queue/stream",
    tag = "queue",
    params(QueueParams),
    responses(
        (status = 200, description = "Flux SSE de la file (init, add, remove)", content_type = "text/event-stream", body = StreamMessage),
        (status = 400, description = "Référence invalide", body = crate::api::ErrorResponse),
        (status = 404, description = "File inconnue", body = crate::api::ErrorResponse)
    )
)]
pub async fn queue_stream(
    State(manager): State<QueueManager>,
    Query(params): Query<QueueParams>,
) -> Response {
    let target = match params.queue_ref() {
        Ok(target) => target,
        Err(err) => return map_error(err),
    };
    let queue = match manager.resolve(&target).await {
        Ok(queue) => queue,
        Err(err) => return map_error(err),
    };
    let (items, mut subscription) = match manager.watch(&queue).await {
        Ok(watch) => watch,
        Err(err) => return map_error(err),
    };

    debug!("Stream opened on queue {} ('{}')", queue.id, queue.name);

    let init = StreamMessage::Init {
        queue_id: queue.id,
        code: queue.code,
        name: queue.name,
        items: views(&items),
    };

    // La souscription vit dans le flux : fermer la connexion la désinscrit
    let stream = stream! {
        yield Event::default().json_data(&init);

        while let Some(event) = subscription.recv().await {
            yield Event::default().json_data(StreamMessage::from(event));
        }

        debug!("Stream on queue {} closed", subscription.queue_id());
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
