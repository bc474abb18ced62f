//! Custom export counters, alongside the HTTP metrics middleware.
//!
//! The counters live in the prometheus default registry and are served at
//! `/metrics/exports`; request-level metrics stay on the middleware's own
//! `/metrics` endpoint.

use actix_web::{HttpResponse, Responder};
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref EXPORTED_DOCUMENTS_TOTAL: IntCounter = register_int_counter!(
        "portal_exported_documents_total",
        "Fiscal documents handed to the archive builder"
    )
    .expect("metric can be registered");
    pub static ref CONVERSION_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "portal_conversion_failures_total",
        "Per-document PDF conversion failures by kind",
        &["kind"]
    )
    .expect("metric can be registered");
}

pub async fn export_metrics() -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        log::error!("Failed to encode export metrics: {}", e);
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn counters_show_up_in_the_encoded_output() {
        EXPORTED_DOCUMENTS_TOTAL.inc();
        CONVERSION_FAILURES_TOTAL.with_label_values(&["gateway"]).inc();

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("portal_exported_documents_total"));
        assert!(output.contains("portal_conversion_failures_total"));
    }
}
