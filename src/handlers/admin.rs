//! # User Management Endpoints
//!
//! Registration and admin endpoints, all direct proxies to the external
//! user-directory service. Directory failures surface to the caller as
//! explicit client errors carrying the upstream message; a missing directory
//! configuration turns every endpoint here into a 503.

use crate::directory::DirectoryClient;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub uid: String,
    pub new_password: String,
}

fn directory(state: &AppState) -> AppResult<&Arc<DirectoryClient>> {
    state
        .directory
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("User directory not initialized".to_string()))
}

/// `POST /api/register-parent` — create an identity record plus the parent
/// profile document, returning `{uid, email}`.
pub async fn register_parent(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.email.is_empty() || req.password.is_empty() || req.name.is_empty() {
        return Err(AppError::BadRequest(
            "email, password and name are required".to_string(),
        ));
    }

    let created = directory(&state)?
        .create_parent(&req.email, &req.password, &req.name)
        .await
        .map_err(|err| AppError::Upstream(err.to_string()))?;

    info!(uid = %created.uid, "Parent account registered");
    Ok(HttpResponse::Ok().json(created))
}

/// `GET /api/admin/parents` — list all parent profiles.
pub async fn list_parents(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let parents = directory(&state)?
        .list_parents()
        .await
        .map_err(|err| AppError::Upstream(err.to_string()))?;

    let count = parents.len();
    Ok(HttpResponse::Ok().json(json!({
        "parents": parents,
        "count": count,
    })))
}

/// `DELETE /api/admin/parents/{uid}` — remove the identity record and the
/// profile document.
pub async fn delete_parent(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let uid = path.into_inner();

    directory(&state)?
        .delete_parent(&uid)
        .await
        .map_err(|err| AppError::Upstream(err.to_string()))?;

    info!(%uid, "Parent account deleted");
    Ok(HttpResponse::Ok().json(json!({ "deleted": uid })))
}

/// `POST /api/admin/reset-password` — overwrite a user's password.
pub async fn reset_password(
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.uid.is_empty() {
        return Err(AppError::BadRequest("uid is required".to_string()));
    }
    if req.new_password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    directory(&state)?
        .set_password(&req.uid, &req.new_password)
        .await
        .map_err(|err| AppError::Upstream(err.to_string()))?;

    info!(uid = %req.uid, "Password updated");
    Ok(HttpResponse::Ok().json(json!({ "updated": req.uid })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use actix_web::web::Data;

    fn state_without_directory() -> Data<AppState> {
        Data::new(AppState::new(AppConfig::default()).unwrap())
    }

    #[actix_web::test]
    async fn test_register_without_directory_is_503() {
        let body = web::Json(RegisterRequest {
            email: "a@b.c".to_string(),
            password: "secret123".to_string(),
            name: "Alice".to_string(),
        });

        let err = register_parent(state_without_directory(), body).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }

    #[actix_web::test]
    async fn test_register_validates_required_fields() {
        let body = web::Json(RegisterRequest {
            email: String::new(),
            password: "secret123".to_string(),
            name: "Alice".to_string(),
        });

        let err = register_parent(state_without_directory(), body).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[actix_web::test]
    async fn test_reset_password_rejects_short_passwords() {
        let body = web::Json(ResetPasswordRequest {
            uid: "u1".to_string(),
            new_password: "12345".to_string(),
        });

        let err = reset_password(state_without_directory(), body).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[actix_web::test]
    async fn test_list_without_directory_is_503() {
        let err = list_parents(state_without_directory()).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }
}
