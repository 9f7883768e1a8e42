use serde::{Deserialize, Serialize};
use std::fmt;

/// Outbound notification requests emitted by the action engine.
///
/// The engine only decides *that* a notification must be queued; delivery
/// (email, chat) happens elsewhere, asynchronously, outside the action's
/// transaction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A contractor submitted; their manager holds the approval link.
    ManagerApprovalRequested,
    ApplicationApproved,
    ApplicationRejected,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ManagerApprovalRequested => "manager_approval_requested",
            NotificationKind::ApplicationApproved => "application_approved",
            NotificationKind::ApplicationRejected => "application_rejected",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
