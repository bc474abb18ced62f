use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod carrier;
pub mod db;
pub mod export;
pub mod metrics;
pub mod nfe;
pub mod user;

pub use crate::db::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::auth::handlers::login,
            crate::nfe::handlers::list_nfes,
            crate::nfe::handlers::get_nfe_by_id,
            crate::export::handlers::export_xml_archive,
            crate::export::handlers::export_pdf_archive,
            crate::export::handlers::download_danfe,
            crate::user::handlers::get_all_users,
            crate::user::handlers::update_user,
            crate::carrier::routes::get_all_carriers,
            crate::carrier::routes::create_carrier,
            crate::carrier::routes::update_carrier,
            crate::carrier::routes::delete_carrier
        ),
        components(
            schemas(
                nfe::models::Nfe,
                nfe::models::NfeStatus,
                auth::model::LoginRequest,
                auth::model::TokenResponse,
                auth::model::UserInfo,
                auth::model::UserRole,
                user::handlers::UpdateUserRequest,
                carrier::model::Carrier,
                carrier::model::CreateCarrierRequest,
                carrier::model::UpdateCarrierRequest,
                export::handlers::ExportRequest,
                ErrorResponse,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "Authentication", description = "Portal login."),
            (name = "Fiscal Documents", description = "NF-e listing and detail."),
            (name = "Exports", description = "Bulk XML/PDF archive generation."),
            (name = "Users", description = "Admin: user role and carrier binding."),
            (name = "Carriers", description = "Admin: carrier company CRUD.")
        )
    )]
    struct ApiDoc;

    dotenvy::dotenv().ok(); // Load .env file
    let app_state = match AppState::new().await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialize application state. Check PORTAL_DATABASE_URL and MEUDANFE_API_KEY in .env. Error: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("carrier_portal_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    log::info!("Starting server at http://0.0.0.0:8080");

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);
        let cors = match std::env::var("PORTAL_ALLOWED_ORIGIN") {
            Ok(origin) if !origin.is_empty() => cors.allowed_origin(&origin),
            _ => cors,
        };

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(
                web::scope("/api")
                    .configure(auth::handlers::config)
                    .configure(user::handlers::config)
                    .configure(carrier::routes::config)
                    .service(
                        web::resource("/nfes")
                            .route(web::get().to(nfe::handlers::list_nfes)),
                    )
                    .service(
                        web::resource("/nfes/{id}/danfe")
                            .route(web::get().to(export::handlers::download_danfe)),
                    )
                    .service(
                        web::resource("/nfes/{id}")
                            .route(web::get().to(nfe::handlers::get_nfe_by_id)),
                    )
                    .service(
                        web::resource("/exports/xml")
                            .route(web::post().to(export::handlers::export_xml_archive)),
                    )
                    .service(
                        web::resource("/exports/pdf")
                            .route(web::post().to(export::handlers::export_pdf_archive)),
                    ),
            )
            .service(
                web::resource("/metrics/exports").route(web::get().to(metrics::export_metrics)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .backlog(8192)
    .max_connections(25000)
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
