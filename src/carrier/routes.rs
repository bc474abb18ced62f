use actix_web::{web, HttpRequest, HttpResponse, Responder};
use uuid::Uuid;

use crate::auth::middleware::{require_admin, validate_request_token};
use crate::carrier::model::{is_valid_cnpj, Carrier, CreateCarrierRequest, UpdateCarrierRequest};
use crate::AppState;

pub const CARRIER_CACHE_KEY: &str = "carriers";

#[utoipa::path(
    get,
    path = "/api/carriers",
    tag = "Carriers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List all carriers", body = Vec<Carrier>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_all_carriers(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    if let Err(e) = validate_request_token(&req) {
        return e.error_response();
    }

    if let Some(cached) = state.carrier_cache.get(CARRIER_CACHE_KEY).await {
        log::debug!("Serving {} carriers from cache", cached.len());
        return HttpResponse::Ok().json(cached);
    }

    match state.get_all_carriers_from_db().await {
        Ok(carriers) => {
            state
                .carrier_cache
                .insert(CARRIER_CACHE_KEY.to_string(), carriers.clone())
                .await;
            HttpResponse::Ok().json(carriers)
        }
        Err(e) => {
            log::error!("Failed to fetch carriers: {}", e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to fetch carriers"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/carriers",
    tag = "Carriers",
    request_body = CreateCarrierRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Carrier created", body = Carrier),
        (status = 400, description = "Invalid CNPJ"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_carrier(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateCarrierRequest>,
) -> impl Responder {
    let claims = match validate_request_token(&req) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };
    if let Err(e) = require_admin(&claims) {
        return e.error_response();
    }

    if body.name.trim().is_empty() {
        return HttpResponse::BadRequest()
            .json(crate::ErrorResponse::bad_request("Carrier name cannot be empty"));
    }
    if !is_valid_cnpj(&body.cnpj) {
        return HttpResponse::BadRequest()
            .json(crate::ErrorResponse::bad_request("Invalid CNPJ format"));
    }

    let carrier = Carrier {
        id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        cnpj: body.cnpj.clone(),
    };

    match state.insert_carrier(&carrier).await {
        Ok(()) => {
            state.carrier_cache.invalidate(CARRIER_CACHE_KEY).await;
            log::info!("Carrier {} created by {}", carrier.id, claims.email);
            HttpResponse::Created().json(carrier)
        }
        Err(e) => {
            log::error!("Failed to create carrier: {}", e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to create carrier"))
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/carriers/{id}",
    tag = "Carriers",
    params(("id" = String, Path, description = "Carrier ID")),
    request_body = UpdateCarrierRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Carrier updated", body = Carrier),
        (status = 404, description = "Carrier not found")
    )
)]
pub async fn update_carrier(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateCarrierRequest>,
) -> impl Responder {
    let claims = match validate_request_token(&req) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };
    if let Err(e) = require_admin(&claims) {
        return e.error_response();
    }

    let id = path.into_inner();
    let existing = match state.get_carrier_by_id(&id).await {
        Ok(Some(carrier)) => carrier,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(crate::ErrorResponse::not_found("Carrier not found"));
        }
        Err(e) => {
            log::error!("Failed to fetch carrier {}: {}", id, e);
            return HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to fetch carrier"));
        }
    };

    let name = body.name.clone().unwrap_or(existing.name);
    let cnpj = body.cnpj.clone().unwrap_or(existing.cnpj);
    if !is_valid_cnpj(&cnpj) {
        return HttpResponse::BadRequest()
            .json(crate::ErrorResponse::bad_request("Invalid CNPJ format"));
    }

    match state.update_carrier(&id, &name, &cnpj).await {
        Ok(Some(carrier)) => {
            state.carrier_cache.invalidate(CARRIER_CACHE_KEY).await;
            HttpResponse::Ok().json(carrier)
        }
        Ok(None) => {
            HttpResponse::NotFound().json(crate::ErrorResponse::not_found("Carrier not found"))
        }
        Err(e) => {
            log::error!("Failed to update carrier {}: {}", id, e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to update carrier"))
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/carriers/{id}",
    tag = "Carriers",
    params(("id" = String, Path, description = "Carrier ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Carrier deleted"),
        (status = 404, description = "Carrier not found")
    )
)]
pub async fn delete_carrier(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let claims = match validate_request_token(&req) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };
    if let Err(e) = require_admin(&claims) {
        return e.error_response();
    }

    let id = path.into_inner();
    match state.delete_carrier(&id).await {
        Ok(true) => {
            state.carrier_cache.invalidate(CARRIER_CACHE_KEY).await;
            log::info!("Carrier {} deleted by {}", id, claims.email);
            HttpResponse::NoContent().finish()
        }
        Ok(false) => {
            HttpResponse::NotFound().json(crate::ErrorResponse::not_found("Carrier not found"))
        }
        Err(e) => {
            log::error!("Failed to delete carrier {}: {}", id, e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to delete carrier"))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/carriers")
            .route(web::get().to(get_all_carriers))
            .route(web::post().to(create_carrier)),
    )
    .service(
        web::resource("/carriers/{id}")
            .route(web::put().to(update_carrier))
            .route(web::delete().to(delete_carrier)),
    );
}
