//! Email eligibility check.
//!
//! An email qualifies when it is syntactically valid AND either its exact
//! address is allow-listed or its domain has a sponsoring organisation.

use lazy_static::lazy_static;
use regex::Regex;

use crate::domains::buyer::errors::ActionError;
use crate::kernel::{BaseDomainRegistry, ServerDeps};

lazy_static! {
    // One non-space local part, one @, a dotted domain. Deliverability is
    // the mailer's problem, not ours.
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub async fn check_email(deps: &ServerDeps, raw: &str) -> Result<bool, ActionError> {
    let email = raw.trim().to_lowercase();

    if !EMAIL_RE.is_match(&email) {
        return Ok(false);
    }

    Ok(deps.registry.email_allowed(&email).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{MockDomainRegistry, TestDependencies};

    fn deps() -> TestDependencies {
        TestDependencies::new().with_registry(
            MockDomainRegistry::new()
                .with_domain("sponsored.org", "Sponsored Org")
                .with_email("lone.wolf@elsewhere.net"),
        )
    }

    #[tokio::test]
    async fn registered_domain_is_allowed() {
        let deps = deps();
        assert!(check_email(&deps.server_deps(), "anyone@sponsored.org")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn exact_allow_listed_email_is_allowed() {
        let deps = deps();
        assert!(
            check_email(&deps.server_deps(), " Lone.Wolf@Elsewhere.NET ")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_domain_is_refused() {
        let deps = deps();
        assert!(!check_email(&deps.server_deps(), "anyone@unknown.org")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn malformed_emails_never_reach_the_registry() {
        let deps = deps();
        for bad in ["not-an-email", "a@b", "a b@sponsored.org", "@sponsored.org"] {
            assert!(
                !check_email(&deps.server_deps(), bad).await.unwrap(),
                "{bad} should be refused"
            );
        }
    }
}
