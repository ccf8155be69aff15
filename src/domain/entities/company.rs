use chrono::NaiveDateTime;
use uuid::Uuid;

/// Tenant aggregate. Subscriptions and members are always owned by a company.
#[derive(Debug, Clone)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_at: Option<NaiveDateTime>,
}
