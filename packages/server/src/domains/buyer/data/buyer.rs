use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::BuyerId;
use crate::domains::buyer::machines::State;
use crate::domains::buyer::models::{
    Buyer, CloudPurchase, Contactable, EmploymentStatus,
};

/// Read-only projection of a buyer application for callers.
///
/// Deliberately excludes `manager_approval_token` and internal bookkeeping
/// (`assigned_to_id`, `decided_at`, `discarded_at`): the secret must never
/// leave the service, the rest is reviewer-side state.
#[derive(Debug, Clone, Serialize)]
pub struct BuyerData {
    pub id: BuyerId,
    pub state: State,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
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

impl From<&Buyer> for BuyerData {
    fn from(buyer: &Buyer) -> Self {
        Self {
            id: buyer.id,
            state: buyer.state,
            started_at: buyer.started_at,
            submitted_at: buyer.submitted_at,
            name: buyer.name.clone(),
            organisation: buyer.organisation.clone(),
            application_body: buyer.application_body.clone(),
            cloud_purchase: buyer.cloud_purchase,
            contactable: buyer.contactable,
            contact_number: buyer.contact_number.clone(),
            employment_status: buyer.employment_status,
            manager_name: buyer.manager_name.clone(),
            manager_email: buyer.manager_email.clone(),
        }
    }
}

impl From<Buyer> for BuyerData {
    fn from(buyer: Buyer) -> Self {
        Self::from(&buyer)
    }
}
