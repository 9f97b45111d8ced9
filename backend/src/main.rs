mod auth;
mod config;
mod db;
mod genai;
mod history;
mod profile;
mod routes;
mod storage;
mod vision;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use auth::cognito_service::CognitoService;
use auth::jwt::JwtService;
use auth::middleware::AuthMiddleware;
use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use config::{AiConfig, AppConfig};
use db::dynamodb_repository::DynamoDbRepository;
use db::store::AccountStore;
use genai::ai_studio_service::AiStudioService;
use genai::client::GeminiClient;
use history::history_service::HistoryService;
use profile::profile_service::ProfileService;
use routes::configure_routes;
use std::sync::Arc;
use storage::s3_service::S3Service;
use vision::client::CloudVisionClient;
use vision::scanner::MedicineScanner;

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    log::error!("Startup failed: {}", e);
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = AppConfig::from_env().map_err(startup_error)?;
    let ai_config = AiConfig::load().map_err(startup_error)?;
    log::info!(
        "Using language model {} and vision endpoint {}",
        ai_config.language_model.model,
        ai_config.vision.base_url
    );

    // Initialize AWS configuration
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let dynamodb_client = DynamoDbClient::new(&aws_config);
    let s3_client = S3Client::new(&aws_config);
    let cognito_client = CognitoClient::new(&aws_config);

    let db_repo = DynamoDbRepository::new(
        dynamodb_client,
        app_config.users_table.clone(),
        app_config.profiles_table.clone(),
        app_config.scans_table.clone(),
        app_config.diagnoses_table.clone(),
    );
    let s3_service = S3Service::new(s3_client, app_config.s3_bucket.clone());
    let history_service = HistoryService::new(db_repo.clone(), s3_service);

    if app_config.cognito_configured() {
        log::info!("Cognito configuration detected");
    } else {
        log::warn!("Cognito is not fully configured. Update the .env file before signing in.");
    }
    let cognito_service = CognitoService::new(
        cognito_client,
        app_config.cognito_client_id.clone(),
        app_config.cognito_client_secret.clone(),
    );
    let accounts: Arc<dyn AccountStore> = Arc::new(db_repo.clone());
    let profile_service = ProfileService::new(accounts.clone(), cognito_service.clone());

    let jwt_service = JwtService::new(&app_config.jwt_secret);
    let auth_middleware = AuthMiddleware::new(jwt_service.clone(), accounts);

    let language_model = Arc::new(GeminiClient::new(
        app_config.ai_studio_api_key.clone(),
        ai_config.language_model.clone(),
    ));
    let ai_service = AiStudioService::new(language_model);
    let annotator = Arc::new(CloudVisionClient::new(
        app_config.vision_api_key.clone(),
        ai_config.vision.clone(),
    ));
    let scanner = MedicineScanner::new(annotator, ai_service.clone());

    let bind_address = format!("0.0.0.0:{}", app_config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::JsonConfig::default().limit(25 * 1024 * 1024))
            .app_data(web::Data::new(db_repo.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::new(cognito_service.clone()))
            .app_data(web::Data::new(profile_service.clone()))
            .app_data(web::Data::new(history_service.clone()))
            .app_data(web::Data::new(ai_service.clone()))
            .app_data(web::Data::new(scanner.clone()))
            .configure(|cfg| configure_routes(cfg, auth_middleware.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
