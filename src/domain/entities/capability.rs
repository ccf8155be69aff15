use serde::{Deserialize, Serialize};

use crate::domain::entities::member::Permission;

/// Subscription-gated actions checked on the hot path of business operations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateWorkspace,
    CreateSheet,
    EditTasks,
    InviteMember,
    UploadAttachment,
}

impl Capability {
    /// The permission a member needs before the capability is allowed,
    /// on top of the company-level subscription gate.
    pub fn required_permission(&self) -> Permission {
        match self {
            Capability::CreateWorkspace | Capability::InviteMember => Permission::Admin,
            Capability::CreateSheet | Capability::EditTasks | Capability::UploadAttachment => {
                Permission::Edit
            }
        }
    }
}
