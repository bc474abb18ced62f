//! Archive assembly for bulk exports.
//!
//! XML mode is a pure transformation with no per-item failure mode. PDF
//! mode converts each document through the gateway, strictly sequentially,
//! and isolates failures: a document that cannot be converted contributes a
//! placeholder text entry instead of aborting the batch. Every input
//! document yields exactly one archive entry either way.

use std::io::{Cursor, Write};

use tokio_util::sync::CancellationToken;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::export::error::{ArchiveError, ConvertError};
use crate::export::gateway::{is_convertible_xml, DanfeGateway};
use crate::metrics;
use crate::nfe::models::Nfe;

/// Build a ZIP holding the raw XML of every document, one entry per record,
/// named from the unique access key. Content is carried verbatim.
pub fn build_xml_archive(documents: &[Nfe]) -> Result<Vec<u8>, ArchiveError> {
    let entries = documents
        .iter()
        .map(|nfe| {
            (
                entry_name(&format!("NFe_{}.xml", nfe.id)),
                nfe.xml_content.clone().into_bytes(),
            )
        })
        .collect();
    write_archive(entries)
}

/// Build a ZIP of converted DANFEs. Documents are processed in input order,
/// one gateway request at a time, with the configured pacing delay between
/// consecutive requests when the batch holds more than one document.
///
/// Conversion failures are recorded as `ERRO_NFe_<number>.txt` entries and
/// never abort the batch; only archive serialization or cancellation fails
/// the whole call.
pub async fn build_pdf_archive(
    gateway: &DanfeGateway,
    documents: &[Nfe],
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ArchiveError> {
    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(documents.len());
    let mut requests_made = false;

    for nfe in documents {
        if cancel.is_cancelled() {
            log::warn!("PDF export cancelled after {} of {} documents", entries.len(), documents.len());
            return Err(ArchiveError::Cancelled);
        }

        let outcome = if !is_convertible_xml(&nfe.xml_content) {
            Err(ConvertError::InvalidXml)
        } else {
            if documents.len() > 1 && requests_made {
                tokio::time::sleep(gateway.pacing()).await;
            }
            requests_made = true;
            gateway.convert(&nfe.xml_content).await
        };

        match outcome {
            Ok(pdf) => {
                log::debug!("Converted NF-e {} to PDF ({} bytes)", nfe.number, pdf.len());
                entries.push((entry_name(&format!("DANFE_{}.pdf", nfe.number)), pdf));
            }
            Err(e) => {
                log::error!("Failed to convert NF-e {}: {}", nfe.number, e);
                metrics::CONVERSION_FAILURES_TOTAL
                    .with_label_values(&[e.kind()])
                    .inc();
                entries.push((
                    entry_name(&format!("ERRO_NFe_{}.txt", nfe.number)),
                    format!("Falha ao gerar PDF: {}", e).into_bytes(),
                ));
            }
        }
    }

    write_archive(entries)
}

/// Entry names are derived from database values; strip anything that could
/// escape the archive root.
fn entry_name(name: &str) -> String {
    sanitize_filename::sanitize(name)
}

fn write_archive(entries: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, ArchiveError> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, data) in entries {
            zip.start_file(name, options)?;
            zip.write_all(&data)?;
        }
        zip.finish()?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::gateway::{GatewayConfig, RetryPolicy};
    use crate::nfe::models::NfeStatus;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::io::Read;
    use std::time::{Duration, Instant};

    fn sample_nfe(id: &str, number: &str, xml_content: &str) -> Nfe {
        Nfe {
            id: id.to_string(),
            number: number.to_string(),
            series: "12".to_string(),
            issued_at: chrono::Utc.with_ymd_and_hms(2025, 5, 4, 14, 47, 0).unwrap(),
            amount: Decimal::new(87613, 2),
            status: NfeStatus::Authorized,
            route: "MG-Capital".to_string(),
            sender_name: "ORGAFARMA".to_string(),
            sender_cnpj: "17291576000158".to_string(),
            recipient_name: "ALESSANDRO REZENDE".to_string(),
            recipient_cnpj: "09412526000153".to_string(),
            carrier_id: "c1".to_string(),
            xml_content: xml_content.to_string(),
            pdf_url: None,
        }
    }

    fn long_xml(marker: &str) -> String {
        format!("<nfeProc marker=\"{}\">{}</nfeProc>", marker, "x".repeat(80))
    }

    fn test_gateway(server: &mockito::Server, pacing_ms: u64) -> DanfeGateway {
        DanfeGateway::new(GatewayConfig {
            api_url: format!("{}/convert", server.url()),
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            pacing: Duration::from_millis(pacing_ms),
            retry: RetryPolicy::none(),
        })
        .unwrap()
    }

    fn read_entry(buffer: &[u8], name: &str) -> Vec<u8> {
        let mut archive = zip::ZipArchive::new(Cursor::new(buffer.to_vec())).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn xml_archive_round_trips_every_document_verbatim() {
        let docs = vec![
            sample_nfe("chave-a", "951354", &long_xml("a")),
            sample_nfe("chave-b", "951355", &long_xml("b")),
        ];

        let buffer = build_xml_archive(&docs).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(buffer.clone())).unwrap();
        assert_eq!(archive.len(), docs.len());
        assert_eq!(read_entry(&buffer, "NFe_chave-a.xml"), long_xml("a").into_bytes());
        assert_eq!(read_entry(&buffer, "NFe_chave-b.xml"), long_xml("b").into_bytes());
    }

    #[test]
    fn xml_archive_of_empty_selection_is_an_empty_archive() {
        let buffer = build_xml_archive(&[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(buffer)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[tokio::test]
    async fn pdf_archive_isolates_per_document_failures() {
        let mut server = mockito::Server::new_async().await;
        let pdf = b"%PDF-1.4 good";
        server
            .mock("POST", "/convert")
            .match_body(mockito::Matcher::Regex("marker=\"good\"".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "data": STANDARD.encode(pdf) }).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/convert")
            .match_body(mockito::Matcher::Regex("marker=\"bad\"".to_string()))
            .with_status(500)
            .with_body(r#"{"message": "conversao indisponivel"}"#)
            .create_async()
            .await;

        let gateway = test_gateway(&server, 0);
        let docs = vec![
            sample_nfe("chave-a", "951354", &long_xml("good")),
            sample_nfe("chave-b", "951355", &long_xml("bad")),
        ];

        let buffer = build_pdf_archive(&gateway, &docs, &CancellationToken::new())
            .await
            .unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(buffer.clone())).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(read_entry(&buffer, "DANFE_951354.pdf"), pdf.to_vec());
        let placeholder = String::from_utf8(read_entry(&buffer, "ERRO_NFe_951355.txt")).unwrap();
        assert!(placeholder.starts_with("Falha ao gerar PDF:"));
        assert!(placeholder.contains("conversao indisponivel"));
    }

    #[tokio::test]
    async fn invalid_xml_yields_placeholder_without_any_gateway_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/convert")
            .expect(0)
            .create_async()
            .await;

        let gateway = test_gateway(&server, 0);
        let docs = vec![sample_nfe("chave-a", "951354", "<curto/>")];

        let buffer = build_pdf_archive(&gateway, &docs, &CancellationToken::new())
            .await
            .unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(buffer.clone())).unwrap();
        assert_eq!(archive.len(), 1);
        let placeholder = String::from_utf8(read_entry(&buffer, "ERRO_NFe_951354.txt")).unwrap();
        assert!(placeholder.contains("XML invalido"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn multi_document_batches_are_paced_between_requests() {
        let mut server = mockito::Server::new_async().await;
        let pdf = STANDARD.encode(b"%PDF-1.4 paced");
        let mock = server
            .mock("POST", "/convert")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "data": pdf }).to_string())
            .expect(3)
            .create_async()
            .await;

        let gateway = test_gateway(&server, 120);
        let docs = vec![
            sample_nfe("a", "1", &long_xml("p1")),
            sample_nfe("b", "2", &long_xml("p2")),
            sample_nfe("c", "3", &long_xml("p3")),
        ];

        let started = Instant::now();
        build_pdf_archive(&gateway, &docs, &CancellationToken::new())
            .await
            .unwrap();

        // Two inter-request gaps of >= 120ms each.
        assert!(started.elapsed() >= Duration::from_millis(240));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn single_document_batch_has_no_enforced_delay() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({ "data": STANDARD.encode(b"%PDF solo") }).to_string(),
            )
            .create_async()
            .await;

        let gateway = test_gateway(&server, 5_000);
        let docs = vec![sample_nfe("a", "1", &long_xml("solo"))];

        let started = Instant::now();
        build_pdf_archive(&gateway, &docs, &CancellationToken::new())
            .await
            .unwrap();

        // A 5s pacing delay would be obvious; a single document must skip it.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/convert")
            .expect(0)
            .create_async()
            .await;

        let gateway = test_gateway(&server, 0);
        let docs = vec![sample_nfe("a", "1", &long_xml("c"))];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = build_pdf_archive(&gateway, &docs, &cancel).await;

        assert!(matches!(result, Err(ArchiveError::Cancelled)));
        mock.assert_async().await;
    }
}
