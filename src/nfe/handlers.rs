//! Listing facade over the document store.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::middleware::{carrier_scope_for, validate_request_token};
use crate::nfe::models::{Nfe, NfeFilter};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NfeListQuery {
    /// Exact issue date, ISO format (YYYY-MM-DD).
    pub issue_date: Option<String>,
    /// Substring of the document number.
    pub number: Option<String>,
    /// Substring of the route label.
    pub route: Option<String>,
    /// Carrier restriction; admins may pass "ALL".
    pub carrier_id: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[utoipa::path(
    get,
    path = "/api/nfes",
    tag = "Fiscal Documents",
    params(NfeListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Filtered documents, newest first", body = Vec<Nfe>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_nfes(
    req: HttpRequest,
    query: web::Query<NfeListQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let claims = match validate_request_token(&req) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };
    let scope = match carrier_scope_for(&claims, query.carrier_id.as_deref()) {
        Ok(scope) => scope,
        Err(e) => return e.error_response(),
    };

    let issue_date = match non_empty(&query.issue_date) {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                return HttpResponse::BadRequest().json(crate::ErrorResponse::bad_request(
                    "issueDate must be an ISO date (YYYY-MM-DD)",
                ));
            }
        },
        None => None,
    };

    let filter = NfeFilter {
        issue_date,
        number: non_empty(&query.number),
        route: non_empty(&query.route),
    };

    match state.documents.list(&scope, &filter).await {
        Ok(documents) => {
            log::debug!("Listing returned {} documents for {:?}", documents.len(), scope);
            HttpResponse::Ok().json(documents)
        }
        Err(e) => {
            log::error!("Failed to fetch NF-es: {}", e);
            HttpResponse::InternalServerError().json(crate::ErrorResponse::internal_error(
                "Falha ao buscar NF-es do servidor.",
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/nfes/{id}",
    tag = "Fiscal Documents",
    params(("id" = String, Path, description = "NF-e access key")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Document found", body = Nfe),
        (status = 404, description = "Document not found")
    )
)]
pub async fn get_nfe_by_id(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let claims = match validate_request_token(&req) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };
    let scope = match carrier_scope_for(&claims, None) {
        Ok(scope) => scope,
        Err(e) => return e.error_response(),
    };

    let id = path.into_inner();
    match state.documents.get(&id).await {
        // Out-of-scope documents read as absent so access keys cannot be probed.
        Ok(Some(nfe)) if scope.permits(&nfe.carrier_id) => HttpResponse::Ok().json(nfe),
        Ok(_) => HttpResponse::NotFound().json(crate::ErrorResponse::not_found(&format!(
            "NF-e {} not found",
            id
        ))),
        Err(e) => {
            log::error!("Failed to fetch NF-e {}: {}", id, e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to fetch NF-e"))
        }
    }
}
