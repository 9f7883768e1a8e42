pub mod audit_event;
pub mod buyer;
pub mod registry;
pub mod store;

pub use audit_event::{AuditEvent, NewAuditEvent, BUYER_ENTITY_TYPE};
pub use buyer::{Buyer, BuyerProfile, CloudPurchase, Contactable, EmploymentStatus};
pub use registry::{BuyerDomain, BuyerEmail, PgDomainRegistry};
pub use store::PgBuyerStore;

#[cfg(test)]
pub mod test_fixtures {
    use super::Buyer;
    use crate::common::UserId;
    use crate::domains::buyer::machines::State;

    /// A minimal application parked in the given state. Tests adjust the
    /// fields the guard under test reads.
    pub fn buyer_in(state: State) -> Buyer {
        let mut buyer = Buyer::blank(UserId::new());
        buyer.state = state;
        buyer
    }
}
