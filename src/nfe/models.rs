use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of an NF-e as reported by the issuing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfeStatus {
    Authorized,
    Cancelled,
    Pending,
}

impl NfeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NfeStatus::Authorized => "AUTHORIZED",
            NfeStatus::Cancelled => "CANCELLED",
            NfeStatus::Pending => "PENDING",
        }
    }
}

impl TryFrom<String> for NfeStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "AUTHORIZED" => Ok(NfeStatus::Authorized),
            "CANCELLED" => Ok(NfeStatus::Cancelled),
            "PENDING" => Ok(NfeStatus::Pending),
            other => Err(format!("unknown NF-e status: {}", other)),
        }
    }
}

/// A fiscal document (NF-e). Immutable input to the export pipeline: the
/// portal never mutates a record after it is issued.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Nfe {
    /// 44-character access key assigned by the origin system.
    #[schema(example = "31250517291576000158550120009513541348716910")]
    pub id: String,
    #[schema(example = "951354")]
    pub number: String,
    #[schema(example = "12")]
    pub series: String,
    pub issued_at: DateTime<Utc>,
    #[schema(example = 876.13)]
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: NfeStatus,
    #[schema(example = "MG-Capital")]
    pub route: String,
    pub sender_name: String,
    pub sender_cnpj: String,
    pub recipient_name: String,
    pub recipient_cnpj: String,
    pub carrier_id: String,
    pub xml_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

/// Visibility restriction applied to every document query. `All` is the
/// privileged sentinel; whether a caller may use it is decided at the auth
/// boundary, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierScope {
    All,
    Carrier(String),
}

impl CarrierScope {
    pub fn permits(&self, carrier_id: &str) -> bool {
        match self {
            CarrierScope::All => true,
            CarrierScope::Carrier(id) => id == carrier_id,
        }
    }
}

/// Free-text filters for the listing facade. Empty options mean "no
/// restriction"; substring matches are case-insensitive, mirroring the
/// ILIKE predicates in the backing store.
#[derive(Debug, Clone, Default)]
pub struct NfeFilter {
    pub issue_date: Option<NaiveDate>,
    pub number: Option<String>,
    pub route: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [NfeStatus::Authorized, NfeStatus::Cancelled, NfeStatus::Pending] {
            let text = status.as_str().to_string();
            assert_eq!(NfeStatus::try_from(text).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(NfeStatus::try_from("AUTORIZADA".to_string()).is_err());
        assert!(NfeStatus::try_from(String::new()).is_err());
    }

    #[test]
    fn scope_permits_matching_carrier_only() {
        let scope = CarrierScope::Carrier("c1".to_string());
        assert!(scope.permits("c1"));
        assert!(!scope.permits("c2"));
        assert!(CarrierScope::All.permits("c2"));
    }
}
