//! Raw database downloads
//!
//! Each store's WAL is checkpointed first so the file on disk is complete.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use ctm_common::StoreKind;
use std::io::{Cursor, Write};
use std::path::Path as FsPath;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::{ApiError, ApiResult, AppState};

/// Name of the archive served by `/download-db/all`
pub const ALL_ARCHIVE: &str = "all_databases.zip";

fn file_name(path: &FsPath) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database.sqlite3".to_string())
}

fn attachment(content_type: &'static str, name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!(r#"attachment; filename="{}""#, name)),
        ],
        bytes,
    )
        .into_response()
}

/// GET /download-db/:name
pub async fn download_one(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Response> {
    let kind = StoreKind::from_name(&name).ok_or_else(|| ApiError::BadRequest("Invalid database name".to_string()))?;
    let path = state.mirror.path(kind).to_path_buf();
    if !tokio::fs::try_exists(&path).await? {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    state.mirror.checkpoint(kind).await?;
    let bytes = tokio::fs::read(&path).await?;
    info!("Serving {} ({} bytes)", path.display(), bytes.len());
    Ok(attachment("application/x-sqlite3", &file_name(&path), bytes))
}

fn zip_files(files: Vec<(String, Vec<u8>)>) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in files {
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// GET /download-db/all
pub async fn download_all(State(state): State<AppState>) -> ApiResult<Response> {
    let kinds = [StoreKind::Editable, StoreKind::Snapshot];

    let mut missing = Vec::new();
    for kind in kinds {
        let path = state.mirror.path(kind);
        if !tokio::fs::try_exists(path).await? {
            missing.push(file_name(path));
        }
    }
    if !missing.is_empty() {
        return Err(ApiError::NotFound(format!("Missing files: {}", missing.join(", "))));
    }

    let mut files = Vec::with_capacity(kinds.len());
    for kind in kinds {
        state.mirror.checkpoint(kind).await?;
        let path = state.mirror.path(kind);
        files.push((file_name(path), tokio::fs::read(path).await?));
    }

    let archive = tokio::task::spawn_blocking(move || zip_files(files))
        .await
        .map_err(|e| ApiError::Internal(format!("Archive task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("Failed to build archive: {}", e)))?;
    info!("Serving {} ({} bytes)", ALL_ARCHIVE, archive.len());
    Ok(attachment("application/zip", ALL_ARCHIVE, archive))
}

pub fn download_routes() -> Router<AppState> {
    Router::new()
        .route("/download-db/all", get(download_all))
        .route("/download-db/:name", get(download_one))
}
