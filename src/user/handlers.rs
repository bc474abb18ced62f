//! Admin area: user listing and role/carrier assignment.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::middleware::{require_admin, validate_request_token};
use crate::auth::model::{UserInfo, UserRole};
use crate::AppState;

/// Role and carrier binding update. An empty carrier id clears the binding.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub role: UserRole,
    pub carrier_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of portal users", body = Vec<UserInfo>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_all_users(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let claims = match validate_request_token(&req) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };
    if let Err(e) = require_admin(&claims) {
        return e.error_response();
    }

    match state.get_all_users().await {
        Ok(users) => {
            let infos: Vec<UserInfo> = users.into_iter().map(UserInfo::from).collect();
            HttpResponse::Ok().json(infos)
        }
        Err(e) => {
            log::error!("Failed to fetch users: {}", e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to fetch users"))
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = UserInfo),
        (status = 404, description = "User not found"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn update_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
) -> impl Responder {
    let claims = match validate_request_token(&req) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };
    if let Err(e) = require_admin(&claims) {
        return e.error_response();
    }

    let id = path.into_inner();
    let carrier_id = body
        .carrier_id
        .as_deref()
        .filter(|value| !value.is_empty());

    match state.update_user_config(&id, body.role, carrier_id).await {
        Ok(Some(user)) => {
            log::info!("User {} updated by {}", id, claims.email);
            HttpResponse::Ok().json(UserInfo::from(user))
        }
        Ok(None) => HttpResponse::NotFound().json(crate::ErrorResponse::not_found(&format!(
            "User with ID {} not found",
            id
        ))),
        Err(e) => {
            log::error!("Failed to update user {}: {}", id, e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to update user"))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/users").route(web::get().to(get_all_users)))
        .service(web::resource("/users/{id}").route(web::put().to(update_user)));
}
