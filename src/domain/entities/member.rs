use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::capability::Capability;

/// Granted permission level within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Admin,
    Edit,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    /// Permissions granted by company admins. Preserved across entitlement
    /// demotion so restoring a subscription restores the same access.
    pub permissions: Vec<Permission>,
    pub status: MemberStatus,
    /// Derived from the company subscription by the billing reconciler.
    /// Never set directly by user action.
    pub entitled: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Member {
    /// Whether this member may exercise a gated capability right now.
    pub fn may(&self, capability: Capability) -> bool {
        self.status == MemberStatus::Active
            && self.entitled
            && self.permissions.contains(&capability.required_permission())
    }
}
