use actix_multipart::Multipart;
use actix_web::{HttpResponse, Result, web};
use base64::{Engine, engine::general_purpose::STANDARD};
use futures::{StreamExt, TryStreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use shared::{DiagnosisRequest, DiagnosisResult, ProfileUpdate, ScanRequest, ScanResult};
use uuid::Uuid;

use crate::auth::middleware::{AuthMiddleware, AuthenticatedUser};
use crate::auth::routes as auth_routes;
use crate::genai::ai_studio_service::AiStudioService;
use crate::history::history_service::HistoryService;
use crate::profile::profile_service::ProfileService;
use crate::storage::s3_service::MAX_IMAGE_BYTES;
use crate::vision::scanner::MedicineScanner;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(error: impl Into<String>) -> ErrorResponse {
    ErrorResponse {
        error: error.into(),
    }
}

/// A result is returned even when it could not be persisted.
#[derive(Serialize)]
struct SavedResponse<T> {
    result: T,
    saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> SavedResponse<T> {
    fn new<E: ToString>(result: T, outcome: std::result::Result<(), E>) -> Self {
        match outcome {
            Ok(()) => Self {
                result,
                saved: true,
                error: None,
            },
            Err(e) => Self {
                result,
                saved: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

impl HistoryQuery {
    fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, auth_middleware: AuthMiddleware) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(
            web::scope("/auth")
                .wrap(auth_middleware.clone())
                .route("/signup", web::post().to(auth_routes::sign_up))
                .route("/signin", web::post().to(auth_routes::sign_in))
                .route("/signout", web::post().to(auth_routes::sign_out))
                .route("/me", web::get().to(auth_routes::me))
                .route("/email", web::put().to(auth_routes::update_email))
                .route("/password", web::put().to(auth_routes::update_password)),
        )
        .service(
            web::scope("/api")
                .wrap(auth_middleware)
                .route("/scan", web::post().to(scan_medicine))
                .route("/scan/upload", web::post().to(upload_scan))
                .route("/medicine/{name}", web::get().to(medicine_lookup))
                .route("/diagnosis", web::post().to(diagnose))
                .route("/scans", web::get().to(list_scans))
                .route("/diagnoses", web::get().to(list_diagnoses))
                .route("/activity", web::get().to(recent_activity))
                .route("/profile", web::get().to(get_profile))
                .route("/profile", web::put().to(update_profile)),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Shared tail of both scan endpoints: identify, store the image, record.
async fn process_scan(
    user_id: Uuid,
    image_base64: &str,
    mime_type: Option<&str>,
    scanner: &MedicineScanner,
    history: &HistoryService,
) -> SavedResponse<ScanResult> {
    let (embedded_mime, payload) = shared::split_data_url(image_base64);
    let mime_type = mime_type.or(embedded_mime);

    let info = scanner.analyze_medicine(payload).await;
    info!("Scan for {} identified {}", user_id, info.medicine_name);

    let image_url = history.store_scan_image(user_id, payload, mime_type).await;
    let scan = ScanResult::new(user_id, image_url, info);
    let outcome = history.record_scan(&scan).await;
    SavedResponse::new(scan, outcome)
}

async fn scan_medicine(
    user: AuthenticatedUser,
    request: web::Json<ScanRequest>,
    scanner: web::Data<MedicineScanner>,
    history: web::Data<HistoryService>,
) -> Result<HttpResponse> {
    if request.image_data.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_response("Image data is required")));
    }

    let response = process_scan(
        user.id,
        &request.image_data,
        request.mime_type.as_deref(),
        &scanner,
        &history,
    )
    .await;
    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("Image is larger than {0} bytes")]
    TooLarge(usize),
    #[error("Invalid multipart upload: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),
}

/// Reads the first non-empty part, giving up as soon as it exceeds `limit`.
async fn read_first_image(
    payload: &mut Multipart,
    limit: usize,
) -> std::result::Result<Option<(Vec<u8>, Option<String>)>, UploadError> {
    while let Some(mut field) = payload.try_next().await? {
        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > limit {
                return Err(UploadError::TooLarge(limit));
            }
            data.extend_from_slice(&chunk);
        }
        if !data.is_empty() {
            return Ok(Some((data, content_type)));
        }
    }
    Ok(None)
}

async fn upload_scan(
    user: AuthenticatedUser,
    mut payload: Multipart,
    scanner: web::Data<MedicineScanner>,
    history: web::Data<HistoryService>,
) -> Result<HttpResponse> {
    let (image_data, mime_type) = match read_first_image(&mut payload, MAX_IMAGE_BYTES).await {
        Ok(Some(image)) => image,
        Ok(None) => {
            warn!("Upload from {} carried no image", user.id);
            return Ok(HttpResponse::BadRequest().json(error_response("No image uploaded")));
        }
        Err(e) => {
            warn!("Rejected upload from {}: {}", user.id, e);
            return Ok(HttpResponse::BadRequest().json(error_response(e.to_string())));
        }
    };

    let image_base64 = STANDARD.encode(&image_data);
    let response = process_scan(
        user.id,
        &image_base64,
        mime_type.as_deref(),
        &scanner,
        &history,
    )
    .await;
    Ok(HttpResponse::Ok().json(response))
}

/// Looks up a medicine typed in by hand instead of scanned.
async fn medicine_lookup(
    path: web::Path<String>,
    ai_service: web::Data<AiStudioService>,
) -> Result<HttpResponse> {
    let name = path.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_response("Medicine name is required")));
    }
    Ok(HttpResponse::Ok().json(ai_service.medicine_info(name).await))
}

async fn diagnose(
    user: AuthenticatedUser,
    request: web::Json<DiagnosisRequest>,
    ai_service: web::Data<AiStudioService>,
    history: web::Data<HistoryService>,
) -> Result<HttpResponse> {
    let request = request.trimmed();
    if request.symptoms.is_empty() || request.diet.is_empty() || request.location.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_response(
            "Symptoms, diet and location are required",
        )));
    }

    let response = ai_service.diagnose(&request).await;
    let diagnosis = DiagnosisResult::new(user.id, request, response);
    let outcome = history.record_diagnosis(&diagnosis).await;
    Ok(HttpResponse::Ok().json(SavedResponse::new(diagnosis, outcome)))
}

async fn list_scans(
    user: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
    history: web::Data<HistoryService>,
) -> Result<HttpResponse> {
    match history.recent_scans(user.id, query.limit()).await {
        Ok(scans) => Ok(HttpResponse::Ok().json(scans)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_response(e.to_string()))),
    }
}

async fn list_diagnoses(
    user: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
    history: web::Data<HistoryService>,
) -> Result<HttpResponse> {
    match history.recent_diagnoses(user.id, query.limit()).await {
        Ok(diagnoses) => Ok(HttpResponse::Ok().json(diagnoses)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_response(e.to_string()))),
    }
}

async fn recent_activity(
    user: AuthenticatedUser,
    history: web::Data<HistoryService>,
) -> Result<HttpResponse> {
    match history.recent_activity(user.id).await {
        Ok(items) => Ok(HttpResponse::Ok().json(items)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_response(e.to_string()))),
    }
}

async fn get_profile(
    user: AuthenticatedUser,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse> {
    match profiles.get_profile(user.id).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(profile)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_response(e.to_string()))),
    }
}

async fn update_profile(
    user: AuthenticatedUser,
    update: web::Json<ProfileUpdate>,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse> {
    if update.is_empty() {
        return get_profile(user, profiles).await;
    }

    match profiles.update_profile(user.id, &update).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(profile)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_response(e.to_string()))),
    }
}
