use std::io;
use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Request, State};
use axum::response::{IntoResponse, Json, Response};
use connexio_store::{BlobStore, StoreError, SyncStore};
use connexio_types::{BlobId, SlotId, SlotSummary, SyncItem};
use futures::TryStreamExt;
use serde_json::json;
use tokio_util::io::StreamReader;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::api::{
    CreateSlotRequest, CreateSlotResponse, HealthResponse, LoadSlotResponse, StatusResponse,
    UploadResponse, UPLOAD_FIELD,
};
use crate::error::{ServerError, ServerResult};

/// The store as shared by all handlers.
pub type SharedStore = Arc<SyncStore>;

/// Run a synchronous store operation on the blocking pool.
///
/// Writers flush to disk under the store lock, and readers may wait on that
/// lock, so no store call runs on an async worker thread.
async fn run_blocking<T, F>(store: &SharedStore, op: F) -> ServerResult<T>
where
    F: FnOnce(&SyncStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ServerError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        Self::rejected(err.status(), err.body_text())
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// The current item, or `{}` when there is none.
pub async fn get_current_handler(State(store): State<SharedStore>) -> ServerResult<Response> {
    let current = run_blocking(&store, |s| s.get_current()).await?;
    Ok(match current {
        Some(item) => Json(item).into_response(),
        None => Json(json!({})).into_response(),
    })
}

pub async fn set_current_handler(
    State(store): State<SharedStore>,
    payload: Result<Json<SyncItem>, JsonRejection>,
) -> ServerResult<Json<StatusResponse>> {
    let Json(item) = payload?;
    run_blocking(&store, move |s| s.set_current(item)).await?;
    Ok(Json(StatusResponse::ok()))
}

pub async fn clear_current_handler(
    State(store): State<SharedStore>,
) -> ServerResult<Json<StatusResponse>> {
    run_blocking(&store, |s| s.clear_current()).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Stream the multipart `file` field into the blob store and make it current.
pub async fn upload_handler(
    State(store): State<SharedStore>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();

        let reader = StreamReader::new(
            field.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        );
        tokio::pin!(reader);

        let file_id = store
            .ingest_upload(filename, mime_type, &mut reader)
            .await
            .map_err(upload_error)?;
        return Ok(Json(UploadResponse::new(file_id)));
    }
    Err(ServerError::Validation(format!(
        "missing multipart field `{UPLOAD_FIELD}`"
    )))
}

// A failure of the request body itself (size limit, malformed part) is the
// client's fault, not a storage failure.
fn upload_error(err: StoreError) -> ServerError {
    if let StoreError::Io(io_err) = &err {
        if let Some(body_err) = io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return ServerError::rejected(body_err.status(), body_err.body_text());
        }
    }
    err.into()
}

/// Serve a stored blob with range and conditional-request support.
pub async fn download_handler(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    request: Request,
) -> ServerResult<Response> {
    let blob_id = BlobId::parse(&id).map_err(|_| ServerError::FileNotFound(id.clone()))?;
    if !store.blobs().exists(&blob_id).await? {
        return Err(ServerError::FileNotFound(id));
    }
    let path = store.blobs().path_of(&blob_id);
    Ok(ServeFile::new(path).oneshot(request).await.into_response())
}

pub async fn list_slots_handler(
    State(store): State<SharedStore>,
) -> ServerResult<Json<Vec<SlotSummary>>> {
    let slots = run_blocking(&store, |s| s.list_slots()).await?;
    Ok(Json(slots))
}

pub async fn create_slot_handler(
    State(store): State<SharedStore>,
    payload: Result<Json<CreateSlotRequest>, JsonRejection>,
) -> ServerResult<Json<CreateSlotResponse>> {
    let Json(CreateSlotRequest { name, item }) = payload?;
    let id = run_blocking(&store, move |s| s.create_slot(name, item)).await?;
    Ok(Json(CreateSlotResponse::new(id)))
}

pub async fn load_slot_handler(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> ServerResult<Json<LoadSlotResponse>> {
    let id = SlotId::from(id);
    let item = run_blocking(&store, move |s| s.load_slot(&id)).await??;
    Ok(Json(LoadSlotResponse::new(item)))
}

/// Always succeeds, whether or not the slot existed.
pub async fn delete_slot_handler(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> ServerResult<Json<StatusResponse>> {
    let id = SlotId::from(id);
    run_blocking(&store, move |s| s.delete_slot(&id)).await?;
    Ok(Json(StatusResponse::ok()))
}
