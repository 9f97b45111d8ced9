use actix_web::{HttpResponse, Result, web};
use log::{error, info, warn};
use shared::{Credentials, EmailUpdate, PasswordUpdate};

use crate::db::dynamodb_repository::DynamoDbRepository;
use crate::db::models::User;
use crate::profile::profile_service::ProfileService;

use super::cognito_service::CognitoService;
use super::jwt::JwtService;
use super::middleware::AuthenticatedUser;
use super::models::{AuthResponse, AuthUser};

const AUTO_SIGN_IN_FAILED: &str =
    "Account created but failed to sign in automatically. Please try signing in manually.";

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(serde::Serialize)]
struct MessageResponse {
    message: String,
}

fn error_response(error: impl Into<String>) -> ErrorResponse {
    ErrorResponse {
        error: error.into(),
    }
}

/// Signs in at Cognito, links the Cognito subject to a local user row and
/// issues the application token.
async fn establish_session(
    email: &str,
    password: &str,
    cognito: &CognitoService,
    jwt: &JwtService,
    db_repo: &DynamoDbRepository,
) -> Result<AuthResponse, String> {
    let session = cognito
        .sign_in(email, password)
        .await
        .map_err(|e| e.to_string())?;
    log::debug!("Cognito session for {} expires in {}s", email, session.expires_in);

    let sub = cognito
        .get_subject(&session.access_token)
        .await
        .map_err(|e| e.to_string())?;

    let existing = db_repo.get_user_by_cognito_sub(&sub).await.map_err(|e| {
        error!("Failed to look up user by cognito sub {}: {:?}", sub, e);
        "Failed to load user account".to_string()
    })?;

    let user = match existing {
        Some(mut user) => {
            user.email = email.to_string();
            user.cognito_access_token = Some(session.access_token);
            user.cognito_refresh_token = session.refresh_token;
            user.update_last_login();
            db_repo.update_user(&user).await.map_err(|e| {
                error!("Failed to update user {}: {:?}", user.id, e);
                "Failed to update user account".to_string()
            })?;
            user
        }
        None => {
            let mut user = User::new(sub, email.to_string());
            user.cognito_access_token = Some(session.access_token);
            user.cognito_refresh_token = session.refresh_token;
            user.update_last_login();
            db_repo.create_user(&user).await.map_err(|e| {
                error!("Failed to create user {}: {:?}", user.email, e);
                "Failed to create user account".to_string()
            })?;
            info!("Created user {} for {}", user.id, user.email);
            user
        }
    };

    let auth_user = AuthUser::from(user);
    let token = jwt.generate_token(&auth_user).map_err(|e| {
        error!("Failed to generate JWT for {}: {:?}", auth_user.id, e);
        "Failed to generate token".to_string()
    })?;

    Ok(AuthResponse {
        token,
        user: auth_user,
    })
}

pub async fn sign_up(
    credentials: web::Json<Credentials>,
    cognito: web::Data<CognitoService>,
    jwt: web::Data<JwtService>,
    db_repo: web::Data<DynamoDbRepository>,
) -> Result<HttpResponse> {
    let email = credentials.email.trim();
    if email.is_empty() || credentials.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_response("Email and password are required")));
    }

    if let Err(e) = cognito.sign_up(email, &credentials.password).await {
        warn!("Sign up failed for {}: {}", email, e);
        return Ok(HttpResponse::BadRequest().json(error_response(e.to_string())));
    }

    match establish_session(email, &credentials.password, &cognito, &jwt, &db_repo).await {
        Ok(response) => Ok(HttpResponse::Created().json(response)),
        Err(e) => {
            warn!("Automatic sign in after sign up failed for {}: {}", email, e);
            Ok(HttpResponse::Accepted().json(MessageResponse {
                message: AUTO_SIGN_IN_FAILED.to_string(),
            }))
        }
    }
}

pub async fn sign_in(
    credentials: web::Json<Credentials>,
    cognito: web::Data<CognitoService>,
    jwt: web::Data<JwtService>,
    db_repo: web::Data<DynamoDbRepository>,
) -> Result<HttpResponse> {
    let email = credentials.email.trim();
    if email.is_empty() || credentials.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_response("Email and password are required")));
    }

    match establish_session(email, &credentials.password, &cognito, &jwt, &db_repo).await {
        Ok(response) => {
            info!("User {} signed in", response.user.id);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            warn!("Sign in failed for {}: {}", email, e);
            Ok(HttpResponse::Unauthorized().json(error_response(e)))
        }
    }
}

pub async fn sign_out(
    user: AuthenticatedUser,
    cognito: web::Data<CognitoService>,
    db_repo: web::Data<DynamoDbRepository>,
) -> Result<HttpResponse> {
    let mut account = match db_repo.get_user_by_id(user.id).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(error_response("User not found")));
        }
        Err(e) => {
            error!("Failed to load user {} for sign out: {:?}", user.id, e);
            return Ok(HttpResponse::InternalServerError().json(error_response("Failed to sign out")));
        }
    };

    if let Some(access_token) = account.cognito_access_token.as_deref() {
        if let Err(e) = cognito.global_sign_out(access_token).await {
            warn!("Cognito global sign out failed for {}: {}", user.id, e);
        }
    }

    account.clear_tokens();
    if let Err(e) = db_repo.update_user(&account).await {
        error!("Failed to clear tokens for {}: {:?}", user.id, e);
        return Ok(HttpResponse::InternalServerError().json(error_response("Failed to sign out")));
    }

    info!("User {} signed out", user.id);
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Signed out".to_string(),
    }))
}

pub async fn me(
    user: AuthenticatedUser,
    db_repo: web::Data<DynamoDbRepository>,
) -> Result<HttpResponse> {
    match db_repo.get_user_by_id(user.id).await {
        Ok(Some(account)) => Ok(HttpResponse::Ok().json(AuthUser::from(account))),
        Ok(None) => {
            warn!("User not found in database for ID: {}", user.id);
            Ok(HttpResponse::NotFound().json(error_response("User not found")))
        }
        Err(e) => {
            error!("Failed to fetch user data for ID {}: {:?}", user.id, e);
            Ok(HttpResponse::InternalServerError().json(error_response("Failed to fetch user")))
        }
    }
}

pub async fn update_email(
    user: AuthenticatedUser,
    body: web::Json<EmailUpdate>,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse> {
    let email = body.email.trim();
    if email.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_response("Email is required")));
    }

    match profiles.update_email(user.id, email).await {
        Ok(account) => Ok(HttpResponse::Ok().json(AuthUser::from(account))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_response(e.to_string()))),
    }
}

pub async fn update_password(
    user: AuthenticatedUser,
    body: web::Json<PasswordUpdate>,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse> {
    if body.current_password.is_empty() || body.new_password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_response(
            "Current and new password are required",
        )));
    }

    match profiles
        .update_password(user.id, &body.current_password, &body.new_password)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(MessageResponse {
            message: "Password updated".to_string(),
        })),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_response(e.to_string()))),
    }
}
