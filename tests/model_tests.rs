//! Wire-format tests: the JSON surface the portal frontend consumes.

use carrier_portal_server::auth::model::{UserInfo, UserRole};
use carrier_portal_server::nfe::models::{Nfe, NfeStatus};
use carrier_portal_server::ErrorResponse;
use chrono::TimeZone;
use rust_decimal::Decimal;

fn sample_nfe() -> Nfe {
    Nfe {
        id: "31250517291576000158550120009513541348716910".to_string(),
        number: "951354".to_string(),
        series: "12".to_string(),
        issued_at: chrono::Utc.with_ymd_and_hms(2025, 5, 4, 14, 47, 0).unwrap(),
        amount: Decimal::new(87613, 2),
        status: NfeStatus::Authorized,
        route: "MG-Capital".to_string(),
        sender_name: "ORGAFARMA ORGANIZACAO FARMACEUTICA".to_string(),
        sender_cnpj: "17291576000158".to_string(),
        recipient_name: "ALESSANDRO REZENDE SANTOS".to_string(),
        recipient_cnpj: "09412526000153".to_string(),
        carrier_id: "c1".to_string(),
        xml_content: "<nfeProc/>".to_string(),
        pdf_url: None,
    }
}

#[test]
fn nfe_serializes_with_camel_case_field_names() {
    let value = serde_json::to_value(sample_nfe()).unwrap();

    assert_eq!(value["carrierId"], "c1");
    assert_eq!(value["xmlContent"], "<nfeProc/>");
    assert_eq!(value["senderCnpj"], "17291576000158");
    assert_eq!(value["status"], "AUTHORIZED");
    assert!(value["issuedAt"].is_string());
    assert!((value["amount"].as_f64().unwrap() - 876.13).abs() < 1e-9);
    // Absent pdf_url stays off the wire entirely.
    assert!(value.get("pdfUrl").is_none());
}

#[test]
fn nfe_round_trips_through_json() {
    let original = sample_nfe();
    let json = serde_json::to_string(&original).unwrap();
    let decoded: Nfe = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded.id, original.id);
    assert_eq!(decoded.issued_at, original.issued_at);
    assert_eq!(decoded.status, original.status);
    assert_eq!(decoded.xml_content, original.xml_content);
}

#[test]
fn status_values_match_the_schema_constraint() {
    assert_eq!(
        serde_json::to_value(NfeStatus::Authorized).unwrap(),
        "AUTHORIZED"
    );
    assert_eq!(
        serde_json::to_value(NfeStatus::Cancelled).unwrap(),
        "CANCELLED"
    );
    assert_eq!(serde_json::to_value(NfeStatus::Pending).unwrap(), "PENDING");
}

#[test]
fn user_info_never_carries_a_password_hash() {
    let info = UserInfo {
        id: "u1".to_string(),
        name: "Administrador".to_string(),
        email: "admin@portal.com".to_string(),
        role: UserRole::Admin,
        carrier_id: None,
    };
    let value = serde_json::to_value(&info).unwrap();

    assert_eq!(value["role"], "ADMIN");
    assert!(value.get("passwordHash").is_none());
    assert!(value.get("password_hash").is_none());
}

#[test]
fn error_response_shape_is_stable() {
    let error = ErrorResponse::bad_request("Invalid CNPJ format");
    let value = serde_json::to_value(&error).unwrap();

    assert_eq!(value["error"], "BadRequest");
    assert_eq!(value["message"], "Invalid CNPJ format");
    assert!(value["timestamp"].is_string());
}
