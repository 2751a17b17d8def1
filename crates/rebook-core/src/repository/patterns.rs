use crate::error::CoreError;
use crate::models::PatternDefinition;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl super::PatternRepository for SqliteRepository {
    async fn insert_pattern(&self, pattern: &PatternDefinition) -> Result<(), CoreError> {
        let definition = serde_json::to_string(pattern)?;
        sqlx::query(
            r#"INSERT INTO patterns (id, resource_id, pattern_type, definition, created_at)
            VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(pattern.id)
        .bind(&pattern.resource_id)
        .bind(pattern.pattern_type.to_string())
        .bind(definition)
        .bind(pattern.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_pattern_by_id(&self, id: Uuid) -> Result<Option<PatternDefinition>, CoreError> {
        let definition: Option<String> =
            sqlx::query_scalar("SELECT definition FROM patterns WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        definition
            .map(|json| serde_json::from_str(&json).map_err(CoreError::from))
            .transpose()
    }
}
