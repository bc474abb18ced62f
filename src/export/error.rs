//! Error taxonomy for the export pipeline.
//!
//! Per-document conversion failures (`ConvertError`) never abort a batch:
//! the archive builder records them as placeholder entries. Only
//! `ArchiveError` aborts the whole operation.

use thiserror::Error;

/// Failure converting one document to PDF. Recorded per document inside a
/// batch; surfaced directly on the single-document path.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// XML payload empty or too short to be a real NF-e. Rejected before
    /// any network call.
    #[error("Conteudo XML invalido ou vazio.")]
    InvalidXml,

    /// The gateway answered with a non-success status. The message embeds
    /// the diagnostic extracted from the response body.
    #[error("API Error: {0}")]
    Gateway(String),

    /// Transport-level failure reaching the gateway (connection refused,
    /// timeout, DNS). Distinct from a gateway-reported error.
    #[error("Erro de Conexao: falha de rede ao contatar a API de PDF: {0}")]
    Connectivity(String),

    /// The response was not one of the accepted payload shapes.
    #[error("Estrutura de resposta da API de PDF desconhecida.")]
    UnrecognizedResponse,
}

impl ConvertError {
    /// Metrics label for this failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::InvalidXml => "validation",
            ConvertError::Gateway(_) => "gateway",
            ConvertError::Connectivity(_) => "connectivity",
            ConvertError::UnrecognizedResponse => "parse",
        }
    }
}

/// Failure of the archive operation as a whole. `Zip` and `Io` cover the
/// final serialization step; `Cancelled` is returned when the caller's
/// cancellation token fires between documents.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to serialize archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to write archive entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("export cancelled before completion")]
    Cancelled,
}

/// Generic document-store failure. The facade does not retry and does not
/// distinguish causes beyond the wrapped driver error.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to fetch fiscal documents: {0}")]
    Fetch(#[from] sqlx::Error),
}
