//! Carrier (transportadora) database operations

use super::AppState;
use crate::carrier::model::Carrier;

impl AppState {
    pub async fn get_all_carriers_from_db(&self) -> Result<Vec<Carrier>, sqlx::Error> {
        sqlx::query_as::<_, Carrier>("SELECT id, name, cnpj FROM carriers ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_carrier_by_id(&self, id: &str) -> Result<Option<Carrier>, sqlx::Error> {
        sqlx::query_as::<_, Carrier>("SELECT id, name, cnpj FROM carriers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_carrier(&self, carrier: &Carrier) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO carriers (id, name, cnpj) VALUES ($1, $2, $3)")
            .bind(&carrier.id)
            .bind(&carrier.name)
            .bind(&carrier.cnpj)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_carrier(
        &self,
        id: &str,
        name: &str,
        cnpj: &str,
    ) -> Result<Option<Carrier>, sqlx::Error> {
        sqlx::query_as::<_, Carrier>(
            "UPDATE carriers SET name = $1, cnpj = $2 WHERE id = $3 RETURNING id, name, cnpj",
        )
        .bind(name)
        .bind(cnpj)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a carrier. Documents referencing it cascade in the schema;
    /// users keep their account with the binding cleared.
    pub async fn delete_carrier(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM carriers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
