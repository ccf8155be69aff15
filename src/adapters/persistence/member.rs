use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{parse_json_with_fallback, PostgresPersistence},
    app_error::{AppError, AppResult},
    application::use_cases::entitlement::MemberRepo,
    domain::entities::member::Member,
};

pub(crate) fn row_to_member(row: &sqlx::postgres::PgRow) -> Member {
    let id: Uuid = row.get("id");
    let permissions_json: serde_json::Value = row.get("permissions");
    Member {
        id,
        company_id: row.get("company_id"),
        user_id: row.get("user_id"),
        permissions: parse_json_with_fallback(
            &permissions_json,
            "permissions",
            "member",
            &id.to_string(),
        ),
        status: row.get("status"),
        entitled: row.get("entitled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl MemberRepo for PostgresPersistence {
    async fn get_by_company_and_user(
        &self,
        company_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Member>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, user_id, permissions, status, entitled, created_at, updated_at
            FROM members
            WHERE company_id = $1 AND user_id = $2
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_member))
    }
}
