//! HTTP upload service around the conversion pipeline.
//!
//! Routes:
//! - `GET /`        upload form
//! - `POST /upload` multipart upload (`file` field), answers with the AMS file
//! - `GET /health`  liveness probe
//!
//! Uses tokio directly rather than a web framework; each connection carries
//! one request.

pub mod http;
pub mod multipart;

use crate::ams_writer;
use crate::config::ConverterConfig;
use crate::error::{AmsError, Result};
use crate::pipeline::{self, ConversionReport};
use crate::reference::{FileReferenceSource, ReferenceProvider, ReloadPolicy};
use crate::spreadsheet;
use http::{read_request, HttpRequest, HttpResponse, RequestError};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const UPLOAD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>AMS Order File Generator</title>
</head>
<body>
    <h2>Upload Shaver Shop Order File</h2>
    <form action="/upload" method="post" enctype="multipart/form-data">
        <input type="file" name="file" accept=".xlsx,.xls,.ods,.csv" required>
        <input type="submit" value="Generate AMS File">
    </form>
</body>
</html>
"#;

pub struct AppState {
    pub config: ConverterConfig,
    pub reference: ReferenceProvider,
}

impl AppState {
    pub fn new(config: ConverterConfig, reference: ReferenceProvider) -> Self {
        Self { config, reference }
    }
}

/// Build the reference provider from `config`, bind and serve.
pub async fn run(config: ConverterConfig) -> Result<()> {
    let source = FileReferenceSource::new(&config.catalog_path, &config.directory_path);
    let reference = ReferenceProvider::new(Arc::new(source), config.reload);
    if reference.policy() == ReloadPolicy::Startup {
        reference.snapshot()?;
    }
    info!("Reference data: {} ({:?})", reference.describe(), reference.policy());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    serve(listener, Arc::new(AppState::new(config, reference))).await
}

/// Accept connections until the listener fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    info!("AMS converter listening on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("New connection from {}", addr);
        tokio::spawn(handle_connection(stream, state.clone()));
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    let response = match read_request(&mut stream, state.config.max_upload_bytes).await {
        Ok(request) => handle_request(request, state).await,
        Err(RequestError::TooLarge(size)) => {
            warn!("Rejected {} byte upload", size);
            HttpResponse::text(413, "Uploaded file is too large")
        }
        Err(RequestError::Malformed(msg)) => HttpResponse::text(400, msg),
        Err(RequestError::Io(e)) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
    };

    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        error!("Failed to write response: {}", e);
    }
    let _ = stream.shutdown().await;
}

pub async fn handle_request(request: HttpRequest, state: Arc<AppState>) -> HttpResponse {
    info!("Request: {} {}", request.method, request.path);

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => HttpResponse::html(UPLOAD_HTML),
        ("GET", "/health") => HttpResponse::json(
            200,
            &serde_json::json!({"status": "ok", "service": "ams-converter"}),
        ),
        ("POST", "/upload") => upload(request, state).await,
        (_, "/" | "/health" | "/upload") => HttpResponse::text(405, "Method Not Allowed"),
        _ => HttpResponse::text(404, "Not Found"),
    }
}

async fn upload(request: HttpRequest, state: Arc<AppState>) -> HttpResponse {
    let request_id = Uuid::new_v4();

    let Some(boundary) = request.header("content-type").and_then(multipart::boundary) else {
        return HttpResponse::text(400, "No file part");
    };
    let parts = match multipart::parse(&request.body, &boundary) {
        Ok(parts) => parts,
        Err(e) => return HttpResponse::text(400, e.to_string()),
    };
    let Some(file) = parts.into_iter().find(|p| p.name == "file") else {
        return HttpResponse::text(400, "No file part");
    };
    let file_name = file.filename.unwrap_or_default();
    if file_name.is_empty() {
        return HttpResponse::text(400, "No selected file");
    }

    info!("[{}] Converting upload '{}' ({} bytes)", request_id, file_name, file.data.len());

    let worker_state = state.clone();
    let result = tokio::task::spawn_blocking(move || convert_upload(&worker_state, &file_name, &file.data)).await;

    match result {
        Ok(Ok((bytes, report))) => {
            info!("[{}] {}", request_id, report.summary());
            HttpResponse::new(200, state.config.output_format().content_type(), bytes)
                .with_header(
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", state.config.output_name),
                )
                .with_header("X-Ams-Warnings", report.warnings.len().to_string())
        }
        Ok(Err(UploadError::Reference(e))) => {
            error!("[{}] Reference data unavailable: {}", request_id, e);
            HttpResponse::text(500, format!("Reference data unavailable: {}", e))
        }
        Ok(Err(UploadError::Input(e))) if e.is_structural() => {
            warn!("[{}] Rejected upload: {}", request_id, e);
            HttpResponse::text(422, e.to_string())
        }
        Ok(Err(UploadError::Input(e))) => {
            warn!("[{}] Unreadable upload: {}", request_id, e);
            HttpResponse::text(400, e.to_string())
        }
        Ok(Err(UploadError::Output(e))) => {
            error!("[{}] Failed to write AMS file: {}", request_id, e);
            HttpResponse::text(500, "Failed to generate AMS file")
        }
        Err(e) => {
            error!("[{}] Conversion task failed: {}", request_id, e);
            HttpResponse::text(500, "Conversion failed")
        }
    }
}

/// Which side of the upload failed.
enum UploadError {
    Reference(AmsError),
    Input(AmsError),
    Output(AmsError),
}

fn convert_upload(state: &AppState, file_name: &str, data: &[u8]) -> std::result::Result<(Vec<u8>, ConversionReport), UploadError> {
    let reference = state.reference.snapshot().map_err(UploadError::Reference)?;
    let orders = spreadsheet::read_bytes(file_name, data).map_err(UploadError::Input)?;
    let conversion = pipeline::convert_table(&orders, &reference, state.config.resolver).map_err(UploadError::Input)?;
    let bytes = ams_writer::to_bytes(&conversion.rows, state.config.output_format()).map_err(UploadError::Output)?;
    Ok((bytes, conversion.report))
}
