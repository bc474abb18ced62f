//! Bulk export and single-document download endpoints.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::auth::middleware::{carrier_scope_for, validate_request_token};
use crate::export::archive::{build_pdf_archive, build_xml_archive};
use crate::export::error::{ArchiveError, ConvertError};
use crate::metrics;
use crate::nfe::models::Nfe;
use crate::AppState;

/// Access keys of the documents selected for export.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportRequest {
    pub ids: Vec<String>,
}

fn attachment(filename: &str, content_type: &str, body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(content_type.to_string())
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body)
}

/// Resolve the export selection under the caller's scope. Out-of-scope ids
/// are excluded rather than reported, so key existence cannot be probed.
async fn selected_documents(
    req: &HttpRequest,
    state: &web::Data<AppState>,
    ids: &[String],
) -> Result<Vec<Nfe>, HttpResponse> {
    let claims = validate_request_token(req).map_err(|e| e.error_response())?;
    let scope = carrier_scope_for(&claims, None).map_err(|e| e.error_response())?;

    if ids.is_empty() {
        return Err(HttpResponse::BadRequest()
            .json(crate::ErrorResponse::bad_request("No documents selected for export")));
    }

    let documents = state.documents.get_many(&scope, ids).await.map_err(|e| {
        log::error!("Failed to fetch export selection: {}", e);
        HttpResponse::InternalServerError()
            .json(crate::ErrorResponse::internal_error("Failed to fetch documents"))
    })?;

    if documents.is_empty() {
        return Err(HttpResponse::BadRequest()
            .json(crate::ErrorResponse::bad_request("No documents selected for export")));
    }

    metrics::EXPORTED_DOCUMENTS_TOTAL.inc_by(documents.len() as u64);
    Ok(documents)
}

#[utoipa::path(
    post,
    path = "/api/exports/xml",
    tag = "Exports",
    request_body = ExportRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "ZIP archive of the selected XMLs"),
        (status = 400, description = "Empty selection"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn export_xml_archive(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ExportRequest>,
) -> impl Responder {
    let documents = match selected_documents(&req, &state, &body.ids).await {
        Ok(documents) => documents,
        Err(response) => return response,
    };
    log::info!("Building XML archive for {} documents", documents.len());

    match build_xml_archive(&documents) {
        Ok(buffer) => {
            let filename =
                format!("xmls_selecionados_{}.zip", chrono::Utc::now().format("%Y-%m-%d"));
            attachment(&filename, "application/zip", buffer)
        }
        Err(e) => {
            log::error!("Failed to serialize XML archive: {}", e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to build archive"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/exports/pdf",
    tag = "Exports",
    request_body = ExportRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "ZIP archive of converted DANFEs, failures become text placeholders"),
        (status = 400, description = "Empty selection"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn export_pdf_archive(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ExportRequest>,
) -> impl Responder {
    let documents = match selected_documents(&req, &state, &body.ids).await {
        Ok(documents) => documents,
        Err(response) => return response,
    };
    log::info!("Building PDF archive for {} documents", documents.len());

    let cancel = CancellationToken::new();
    match build_pdf_archive(&state.gateway, &documents, &cancel).await {
        Ok(buffer) => {
            let filename = format!("pdfs_danfes_{}.zip", chrono::Utc::now().format("%Y-%m-%d"));
            attachment(&filename, "application/zip", buffer)
        }
        Err(ArchiveError::Cancelled) => {
            log::warn!("PDF export cancelled");
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Export cancelled"))
        }
        Err(e) => {
            log::error!("Failed to serialize PDF archive: {}", e);
            HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to build archive"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/nfes/{id}/danfe",
    tag = "Exports",
    params(("id" = String, Path, description = "NF-e access key")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "DANFE PDF for one document"),
        (status = 400, description = "Document XML invalid"),
        (status = 404, description = "Document not found"),
        (status = 502, description = "Gateway failure"),
        (status = 503, description = "Gateway unreachable")
    )
)]
pub async fn download_danfe(
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
    let nfe = match state.documents.get(&id).await {
        Ok(Some(nfe)) if scope.permits(&nfe.carrier_id) => nfe,
        Ok(_) => {
            return HttpResponse::NotFound().json(crate::ErrorResponse::not_found(&format!(
                "NF-e {} not found",
                id
            )));
        }
        Err(e) => {
            log::error!("Failed to fetch NF-e {}: {}", id, e);
            return HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Failed to fetch NF-e"));
        }
    };

    // No archive to absorb failures here; every error kind surfaces.
    match state.gateway.convert(&nfe.xml_content).await {
        Ok(pdf) => {
            metrics::EXPORTED_DOCUMENTS_TOTAL.inc();
            attachment(&format!("DANFE_{}.pdf", nfe.number), "application/pdf", pdf)
        }
        Err(e) => {
            log::error!("Failed to convert NF-e {}: {}", nfe.number, e);
            metrics::CONVERSION_FAILURES_TOTAL
                .with_label_values(&[e.kind()])
                .inc();
            match e {
                ConvertError::InvalidXml => HttpResponse::BadRequest()
                    .json(crate::ErrorResponse::bad_request(&e.to_string())),
                ConvertError::Gateway(_) | ConvertError::UnrecognizedResponse => {
                    HttpResponse::BadGateway()
                        .json(crate::ErrorResponse::new("BadGateway", &e.to_string()))
                }
                ConvertError::Connectivity(_) => HttpResponse::ServiceUnavailable()
                    .json(crate::ErrorResponse::new("ServiceUnavailable", &e.to_string())),
            }
        }
    }
}
