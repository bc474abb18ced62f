use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

lazy_static! {
    // 14 digits, standard punctuation optional: 12.345.678/0001-90
    static ref CNPJ_RE: Regex =
        Regex::new(r"^\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}$").expect("valid CNPJ regex");
}

/// Shape check only; digit verification is the issuing registry's problem.
pub fn is_valid_cnpj(cnpj: &str) -> bool {
    CNPJ_RE.is_match(cnpj)
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Carrier {
    #[schema(example = "c1")]
    pub id: String,
    #[schema(example = "TransRapido Logistica")]
    pub name: String,
    #[schema(example = "12.345.678/0001-90")]
    pub cnpj: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCarrierRequest {
    pub name: String,
    pub cnpj: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCarrierRequest {
    pub name: Option<String>,
    pub cnpj: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_punctuated_and_bare_cnpj() {
        assert!(is_valid_cnpj("12.345.678/0001-90"));
        assert!(is_valid_cnpj("12345678000190"));
    }

    #[test]
    fn rejects_malformed_cnpj() {
        assert!(!is_valid_cnpj(""));
        assert!(!is_valid_cnpj("12.345.678/0001"));
        assert!(!is_valid_cnpj("abcdefghijklmn"));
        assert!(!is_valid_cnpj("123456780001901"));
    }
}
