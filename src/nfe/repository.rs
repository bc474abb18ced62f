//! Document store access behind an explicit, injectable interface.
//!
//! The pipeline never touches ambient state: it receives a
//! `DocumentRepository` (Postgres in production, in-memory for tests) and
//! treats the records it gets back as immutable inputs.

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::export::error::RepositoryError;
use crate::nfe::models::{CarrierScope, Nfe, NfeFilter};

const NFE_COLUMNS: &str = "id, number, series, issued_at, amount, status, route, \
     sender_name, sender_cnpj, recipient_name, recipient_cnpj, carrier_id, xml_content, pdf_url";

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Scope-restricted, filtered listing, newest first. Pure projection:
    /// no side effects, no retry.
    async fn list(&self, scope: &CarrierScope, filter: &NfeFilter)
        -> Result<Vec<Nfe>, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<Nfe>, RepositoryError>;

    /// Fetch a selection by id, applying the same scope restriction and
    /// ordering as `list`. Ids outside the scope are silently excluded.
    async fn get_many(
        &self,
        scope: &CarrierScope,
        ids: &[String],
    ) -> Result<Vec<Nfe>, RepositoryError>;

    async fn save(&self, nfe: &Nfe) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// Postgres-backed repository. Predicates mirror the portal's original
/// query surface: exact calendar date on `issued_at`, ILIKE containment on
/// `number` and `route`, strict newest-first ordering.
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn list(
        &self,
        scope: &CarrierScope,
        filter: &NfeFilter,
    ) -> Result<Vec<Nfe>, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM nfes", NFE_COLUMNS));
        let mut sep = " WHERE ";

        if let CarrierScope::Carrier(carrier_id) = scope {
            qb.push(sep).push("carrier_id = ").push_bind(carrier_id.clone());
            sep = " AND ";
        }
        if let Some(issue_date) = filter.issue_date {
            qb.push(sep).push("issued_at::date = ").push_bind(issue_date);
            sep = " AND ";
        }
        if let Some(number) = &filter.number {
            qb.push(sep)
                .push("number ILIKE ")
                .push_bind(format!("%{}%", number));
            sep = " AND ";
        }
        if let Some(route) = &filter.route {
            qb.push(sep)
                .push("route ILIKE ")
                .push_bind(format!("%{}%", route));
        }
        qb.push(" ORDER BY issued_at DESC");

        let rows = qb.build_query_as::<Nfe>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn get(&self, id: &str) -> Result<Option<Nfe>, RepositoryError> {
        let row = sqlx::query_as::<_, Nfe>(&format!(
            "SELECT {} FROM nfes WHERE id = $1",
            NFE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_many(
        &self,
        scope: &CarrierScope,
        ids: &[String],
    ) -> Result<Vec<Nfe>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM nfes WHERE id = ANY(", NFE_COLUMNS));
        qb.push_bind(ids.to_vec()).push(")");
        if let CarrierScope::Carrier(carrier_id) = scope {
            qb.push(" AND carrier_id = ").push_bind(carrier_id.clone());
        }
        qb.push(" ORDER BY issued_at DESC");

        let rows = qb.build_query_as::<Nfe>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn save(&self, nfe: &Nfe) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO nfes (id, number, series, issued_at, amount, status, route,
                sender_name, sender_cnpj, recipient_name, recipient_cnpj, carrier_id,
                xml_content, pdf_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE
            SET status = $6, pdf_url = $14
            "#,
        )
        .bind(&nfe.id)
        .bind(&nfe.number)
        .bind(&nfe.series)
        .bind(nfe.issued_at)
        .bind(nfe.amount)
        .bind(nfe.status.as_str())
        .bind(&nfe.route)
        .bind(&nfe.sender_name)
        .bind(&nfe.sender_cnpj)
        .bind(&nfe.recipient_name)
        .bind(&nfe.recipient_cnpj)
        .bind(&nfe.carrier_id)
        .bind(&nfe.xml_content)
        .bind(nfe.pdf_url.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM nfes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-memory repository with the same filtering semantics as the Postgres
/// implementation. Used by tests in place of a live database.
#[derive(Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<Vec<Nfe>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<Nfe>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }
}

fn matches_filter(nfe: &Nfe, filter: &NfeFilter) -> bool {
    if let Some(issue_date) = filter.issue_date {
        if nfe.issued_at.date_naive() != issue_date {
            return false;
        }
    }
    if let Some(number) = &filter.number {
        if !nfe.number.to_lowercase().contains(&number.to_lowercase()) {
            return false;
        }
    }
    if let Some(route) = &filter.route {
        if !nfe.route.to_lowercase().contains(&route.to_lowercase()) {
            return false;
        }
    }
    true
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn list(
        &self,
        scope: &CarrierScope,
        filter: &NfeFilter,
    ) -> Result<Vec<Nfe>, RepositoryError> {
        let documents = self.documents.read();
        let mut selected: Vec<Nfe> = documents
            .iter()
            .filter(|nfe| scope.permits(&nfe.carrier_id) && matches_filter(nfe, filter))
            .cloned()
            .collect();
        // Stable sort keeps storage order for equal timestamps.
        selected.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(selected)
    }

    async fn get(&self, id: &str) -> Result<Option<Nfe>, RepositoryError> {
        Ok(self.documents.read().iter().find(|n| n.id == id).cloned())
    }

    async fn get_many(
        &self,
        scope: &CarrierScope,
        ids: &[String],
    ) -> Result<Vec<Nfe>, RepositoryError> {
        let documents = self.documents.read();
        let mut selected: Vec<Nfe> = documents
            .iter()
            .filter(|nfe| ids.contains(&nfe.id) && scope.permits(&nfe.carrier_id))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(selected)
    }

    async fn save(&self, nfe: &Nfe) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write();
        if let Some(existing) = documents.iter_mut().find(|n| n.id == nfe.id) {
            *existing = nfe.clone();
        } else {
            documents.push(nfe.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|n| n.id != id);
        Ok(documents.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfe::models::NfeStatus;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn nfe(id: &str, number: &str, carrier_id: &str, route: &str, day: u32) -> Nfe {
        Nfe {
            id: id.to_string(),
            number: number.to_string(),
            series: "1".to_string(),
            issued_at: chrono::Utc.with_ymd_and_hms(2025, 5, day, 12, 0, 0).unwrap(),
            amount: Decimal::new(100_00, 2),
            status: NfeStatus::Authorized,
            route: route.to_string(),
            sender_name: "sender".to_string(),
            sender_cnpj: "11111111000111".to_string(),
            recipient_name: "recipient".to_string(),
            recipient_cnpj: "22222222000122".to_string(),
            carrier_id: carrier_id.to_string(),
            xml_content: "<xml/>".repeat(20),
            pdf_url: None,
        }
    }

    fn seeded() -> InMemoryDocumentRepository {
        InMemoryDocumentRepository::with_documents(vec![
            nfe("key-1", "951354", "c1", "MG-Capital", 4),
            nfe("key-2", "951355", "c1", "SP-MG", 5),
            nfe("key-3", "888001", "c2", "Sul-Sudeste", 6),
        ])
    }

    #[tokio::test]
    async fn carrier_scope_restricts_listing_and_orders_newest_first() {
        let repo = seeded();
        let docs = repo
            .list(&CarrierScope::Carrier("c1".to_string()), &NfeFilter::default())
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].number, "951355");
        assert_eq!(docs[1].number, "951354");
    }

    #[tokio::test]
    async fn all_scope_returns_everything() {
        let repo = seeded();
        let docs = repo.list(&CarrierScope::All, &NfeFilter::default()).await.unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].number, "888001");
    }

    #[tokio::test]
    async fn number_filter_matches_substring_preserving_order() {
        let repo = seeded();
        let filter = NfeFilter {
            number: Some("9513".to_string()),
            ..Default::default()
        };
        let docs = repo.list(&CarrierScope::All, &filter).await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].number, "951355");
        assert_eq!(docs[1].number, "951354");
    }

    #[tokio::test]
    async fn route_filter_is_case_insensitive() {
        let repo = seeded();
        let filter = NfeFilter {
            route: Some("sul".to_string()),
            ..Default::default()
        };
        let docs = repo.list(&CarrierScope::All, &filter).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].number, "888001");
    }

    #[tokio::test]
    async fn issue_date_filter_matches_calendar_date() {
        let repo = seeded();
        let filter = NfeFilter {
            issue_date: chrono::NaiveDate::from_ymd_opt(2025, 5, 5),
            ..Default::default()
        };
        let docs = repo.list(&CarrierScope::All, &filter).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "key-2");
    }

    #[tokio::test]
    async fn equal_timestamps_keep_storage_order() {
        let repo = InMemoryDocumentRepository::with_documents(vec![
            nfe("first", "100", "c1", "r", 4),
            nfe("second", "200", "c1", "r", 4),
        ]);
        let docs = repo.list(&CarrierScope::All, &NfeFilter::default()).await.unwrap();
        assert_eq!(docs[0].id, "first");
        assert_eq!(docs[1].id, "second");
    }

    #[tokio::test]
    async fn get_many_excludes_ids_outside_scope() {
        let repo = seeded();
        let ids = vec!["key-1".to_string(), "key-3".to_string()];
        let docs = repo
            .get_many(&CarrierScope::Carrier("c1".to_string()), &ids)
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "key-1");
    }

    #[tokio::test]
    async fn save_upserts_and_delete_reports_presence() {
        let repo = InMemoryDocumentRepository::new();
        let doc = nfe("key-9", "999", "c1", "r", 4);

        repo.save(&doc).await.unwrap();
        let mut updated = doc.clone();
        updated.status = NfeStatus::Cancelled;
        repo.save(&updated).await.unwrap();

        let fetched = repo.get("key-9").await.unwrap().unwrap();
        assert_eq!(fetched.status, NfeStatus::Cancelled);

        assert!(repo.delete("key-9").await.unwrap());
        assert!(!repo.delete("key-9").await.unwrap());
    }
}
