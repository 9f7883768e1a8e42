use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{BuyerId, UserId};
use crate::domains::buyer::machines::State;

/// What the applicant plans to purchase through the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cloud_purchase", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CloudPurchase {
    MakePurchase,
    PlanPurchase,
    NoPlan,
}

/// How the applicant prefers to be contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contactable", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Contactable {
    PhoneNumber,
    Email,
    None,
}

/// Employment status drives the manager-approval guard: contractors need
/// out-of-band manager sign-off before review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "employment_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentStatus {
    Employee,
    Contractor,
    OtherEligible,
}

/// Buyer application - SQL persistence layer
///
/// One non-discarded row per applicant (`user_id`). The `state` column is
/// mutated exclusively through the action engine; everything else is
/// applicant-supplied profile data or bookkeeping stamped by actions.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Buyer {
    pub id: BuyerId,
    pub user_id: UserId,
    pub state: State,

    // Profile fields (applicant-supplied, presence-validated only where a
    // business rule demands it)
    pub name: Option<String>,
    pub organisation: Option<String>,
    pub application_body: Option<String>,
    pub cloud_purchase: Option<CloudPurchase>,
    pub contactable: Option<Contactable>,
    pub contact_number: Option<String>,
    pub employment_status: Option<EmploymentStatus>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,

    // Review bookkeeping
    pub assigned_to_id: Option<UserId>,
    /// Single-use secret for the out-of-band manager-approval link.
    /// Cleared when consumed. Never serialized to callers.
    pub manager_approval_token: Option<String>,
    pub decision_body: Option<String>,

    // Lifecycle timestamps, each set at most once
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub manager_approved_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,

    // Soft delete
    pub discarded_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Applicant-supplied profile fields, as received by the create/update
/// endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub name: Option<String>,
    pub organisation: Option<String>,
    pub application_body: Option<String>,
    pub cloud_purchase: Option<CloudPurchase>,
    pub contactable: Option<Contactable>,
    pub contact_number: Option<String>,
    pub employment_status: Option<EmploymentStatus>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
}

impl Buyer {
    /// Start a fresh application in `created` for the given applicant.
    pub fn new(user_id: UserId, profile: BuyerProfile) -> Self {
        let now = Utc::now();
        let mut buyer = Self::blank(user_id);
        buyer.started_at = Some(now);
        buyer.apply_profile(profile);
        buyer
    }

    /// An empty record in the initial state. Used by `new` and by the
    /// auto-registration path, which fills fields itself.
    pub fn blank(user_id: UserId) -> Self {
        Self {
            id: BuyerId::new(),
            user_id,
            state: State::Created,
            name: None,
            organisation: None,
            application_body: None,
            cloud_purchase: None,
            contactable: None,
            contact_number: None,
            employment_status: None,
            manager_name: None,
            manager_email: None,
            assigned_to_id: None,
            manager_approval_token: None,
            decision_body: None,
            started_at: None,
            submitted_at: None,
            manager_approved_at: None,
            decided_at: None,
            discarded_at: None,
            created_at: Utc::now(),
        }
    }

    /// Merge applicant-supplied fields. `None`s leave existing values alone.
    pub fn apply_profile(&mut self, profile: BuyerProfile) {
        let BuyerProfile {
            name,
            organisation,
            application_body,
            cloud_purchase,
            contactable,
            contact_number,
            employment_status,
            manager_name,
            manager_email,
        } = profile;

        if name.is_some() {
            self.name = name;
        }
        if organisation.is_some() {
            self.organisation = organisation;
        }
        if application_body.is_some() {
            self.application_body = application_body;
        }
        if cloud_purchase.is_some() {
            self.cloud_purchase = cloud_purchase;
        }
        if contactable.is_some() {
            self.contactable = contactable;
        }
        if contact_number.is_some() {
            self.contact_number = contact_number;
        }
        if employment_status.is_some() {
            self.employment_status = employment_status;
        }
        if manager_name.is_some() {
            self.manager_name = manager_name;
        }
        if manager_email.is_some() {
            self.manager_email = manager_email;
        }
    }

    /// Mint a fresh single-use manager-approval secret (32 hex chars).
    pub fn issue_manager_approval_token(&mut self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.manager_approval_token = Some(token.clone());
        token
    }

    pub fn approved(&self) -> bool {
        self.state == State::Approved
    }

    pub fn in_progress(&self) -> bool {
        self.state == State::Created
    }

    pub fn discarded(&self) -> bool {
        self.discarded_at.is_some()
    }
}
