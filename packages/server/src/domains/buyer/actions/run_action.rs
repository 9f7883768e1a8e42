//! The action engine.
//!
//! `run_action` is the only write path for a buyer application's state:
//! legality check against the current state's action set, authorization
//! against the policy, the guarded transition, then one atomic commit of
//! entity mutation + audit event. Notification requests go out after the
//! commit, fire-and-forget.

use chrono::Utc;
use tracing::info;

use crate::common::{Actor, UserId};
use crate::domains::buyer::errors::ActionError;
use crate::domains::buyer::events::NotificationKind;
use crate::domains::buyer::machines::{self, ActionKind, State};
use crate::domains::buyer::models::{Buyer, EmploymentStatus, NewAuditEvent};
use crate::domains::buyer::policy;
use crate::kernel::{BaseBuyerStore, BaseNotificationDispatcher, ServerDeps, StoreError};

/// A requested action with its payload.
#[derive(Debug, Clone)]
pub enum BuyerAction {
    Submit,
    ManagerApproval,
    Assign {
        assignee_id: UserId,
        assignee_email: String,
    },
    Approve {
        response: String,
    },
    Decline {
        response: String,
    },
    Deactivate,
}

impl BuyerAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            BuyerAction::Submit => ActionKind::Submit,
            BuyerAction::ManagerApproval => ActionKind::ManagerApproval,
            BuyerAction::Assign { .. } => ActionKind::Assign,
            BuyerAction::Approve { .. } => ActionKind::Approve,
            BuyerAction::Decline { .. } => ActionKind::Decline,
            BuyerAction::Deactivate => ActionKind::Deactivate,
        }
    }
}

/// How the request authenticated.
///
/// The manager-approval link authenticates by possession of the single-use
/// token, not by actor identity - a distinct mode, not a special case of
/// the actor check.
#[derive(Debug, Clone, Copy)]
pub enum AuthMode<'a> {
    Actor(&'a Actor),
    ApprovalToken,
}

impl<'a> AuthMode<'a> {
    fn actor(&self) -> Option<&'a Actor> {
        match self {
            AuthMode::Actor(actor) => Some(actor),
            AuthMode::ApprovalToken => None,
        }
    }
}

/// What a successful action hands back to the caller.
#[derive(Debug)]
pub struct ActionOutcome {
    pub buyer: Buyer,
    /// Human-readable description of what happened; also the audit note.
    pub note: String,
}

struct Applied {
    note: String,
    notifications: Vec<NotificationKind>,
}

/// Validate, authorize, transition, and atomically persist one action.
pub async fn run_action(
    deps: &ServerDeps,
    mut buyer: Buyer,
    action: BuyerAction,
    auth: AuthMode<'_>,
) -> Result<ActionOutcome, ActionError> {
    let kind = action.kind();

    if !buyer.state.allows(kind) {
        return Err(ActionError::InvalidAction {
            action: kind,
            state: buyer.state,
        });
    }

    if let AuthMode::Actor(actor) = auth {
        if !policy::can_run(actor, &buyer, kind) {
            return Err(ActionError::Unauthorized {
                action: kind,
                email: actor.email.clone(),
            });
        }
    }

    let expected_state = buyer.state;
    let applied = apply(&mut buyer, &action, auth.actor())?;

    // Token-authenticated approvals carry no actor, hence no audit row.
    let event = auth
        .actor()
        .map(|actor| NewAuditEvent::for_buyer(buyer.id, actor.id, applied.note.clone()));

    if let Err(e) = deps.store.commit_action(&buyer, expected_state, event).await {
        return Err(match e {
            // Lost a race: report the state the winning action left behind.
            StoreError::StaleState => {
                let state = deps
                    .store
                    .find_by_id(buyer.id)
                    .await
                    .ok()
                    .flatten()
                    .map(|b| b.state)
                    .unwrap_or(expected_state);
                ActionError::InvalidAction {
                    action: kind,
                    state,
                }
            }
            other => ActionError::Store(other),
        });
    }

    // Outside the transaction boundary: a dispatch failure is the
    // dispatcher's problem, never the action's.
    for notification in &applied.notifications {
        deps.notifications.enqueue(*notification, buyer.id).await;
    }

    info!(
        buyer_id = %buyer.id,
        action = %kind,
        from = %expected_state,
        to = %buyer.state,
        "buyer action applied"
    );

    Ok(ActionOutcome {
        buyer,
        note: applied.note,
    })
}

/// Mutate the entity for one action and resolve its transition.
///
/// Pure over the entity: no IO, clock reads only. The caller owns the
/// entity copy, so nothing leaks if the commit later fails.
fn apply(
    buyer: &mut Buyer,
    action: &BuyerAction,
    actor: Option<&Actor>,
) -> Result<Applied, ActionError> {
    let now = Utc::now();

    match action {
        BuyerAction::Submit => {
            let actor = require_actor(actor, ActionKind::Submit)?;

            // Contractors need a manager to approve out of band, so the
            // manager's email is mandatory at submission.
            if buyer.employment_status == Some(EmploymentStatus::Contractor)
                && buyer.manager_email.as_deref().map_or(true, str::is_empty)
            {
                return Err(ActionError::Validation {
                    field: "manager_email",
                    message: "manager email is required for contractors".into(),
                });
            }

            buyer.submitted_at.get_or_insert(now);
            transition(buyer, ActionKind::Submit)?;

            let mut notifications = Vec::new();
            if buyer.state == State::AwaitingManagerApproval {
                buyer.issue_manager_approval_token();
                notifications.push(NotificationKind::ManagerApprovalRequested);
            }

            Ok(Applied {
                note: format!("Buyer submitted by {}", actor.email),
                notifications,
            })
        }

        BuyerAction::ManagerApproval => {
            buyer.manager_approved_at.get_or_insert(now);
            // Single-use: consumed on approval.
            buyer.manager_approval_token = None;
            transition(buyer, ActionKind::ManagerApproval)?;

            Ok(Applied {
                note: format!(
                    "Manager {} ({}) approved the buyer",
                    buyer.manager_name.as_deref().unwrap_or("unknown"),
                    buyer.manager_email.as_deref().unwrap_or("unknown"),
                ),
                notifications: Vec::new(),
            })
        }

        BuyerAction::Assign {
            assignee_id,
            assignee_email,
        } => {
            let actor = require_actor(actor, ActionKind::Assign)?;
            buyer.assigned_to_id = Some(*assignee_id);
            transition(buyer, ActionKind::Assign)?;

            Ok(Applied {
                note: format!(
                    "Buyer submission assigned by {} to {}.",
                    actor.email, assignee_email
                ),
                notifications: Vec::new(),
            })
        }

        BuyerAction::Approve { response } => {
            let actor = require_actor(actor, ActionKind::Approve)?;
            buyer.decided_at.get_or_insert(now);
            buyer.decision_body = Some(response.clone());
            transition(buyer, ActionKind::Approve)?;

            Ok(Applied {
                note: format!(
                    "Buyer approved by {}. Response was: {}.",
                    actor.email, response
                ),
                notifications: vec![NotificationKind::ApplicationApproved],
            })
        }

        BuyerAction::Decline { response } => {
            let actor = require_actor(actor, ActionKind::Decline)?;
            buyer.decided_at.get_or_insert(now);
            buyer.decision_body = Some(response.clone());
            transition(buyer, ActionKind::Decline)?;

            Ok(Applied {
                note: format!(
                    "Buyer declined by {}. Response was: {}.",
                    actor.email, response
                ),
                notifications: vec![NotificationKind::ApplicationRejected],
            })
        }

        BuyerAction::Deactivate => {
            let actor = require_actor(actor, ActionKind::Deactivate)?;
            transition(buyer, ActionKind::Deactivate)?;

            Ok(Applied {
                note: format!("Buyer deactivated by {}.", actor.email),
                notifications: Vec::new(),
            })
        }
    }
}

fn transition(buyer: &mut Buyer, event: ActionKind) -> Result<(), ActionError> {
    let to = machines::next_state(event, buyer).map_err(|e| ActionError::InvalidAction {
        action: e.event,
        state: e.state,
    })?;
    buyer.state = to;
    Ok(())
}

fn require_actor<'a>(actor: Option<&'a Actor>, action: ActionKind) -> Result<&'a Actor, ActionError> {
    actor.ok_or_else(|| ActionError::Unauthorized {
        action,
        email: "anonymous".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::buyer::models::{BuyerProfile, EmploymentStatus};
    use crate::kernel::TestDependencies;

    fn applicant_buyer(employment: EmploymentStatus) -> (Buyer, Actor) {
        let user_id = UserId::new();
        let buyer = Buyer::new(
            user_id,
            BuyerProfile {
                name: Some("Ada Lovelace".into()),
                organisation: Some("Initech".into()),
                employment_status: Some(employment),
                manager_name: Some("Grace Hopper".into()),
                manager_email: Some("grace@initech.example".into()),
                ..Default::default()
            },
        );
        let actor = Actor::applicant(user_id, "ada@initech.example");
        (buyer, actor)
    }

    async fn seeded(buyer: &Buyer) -> TestDependencies {
        let deps = TestDependencies::new();
        deps.store.insert(buyer).await.unwrap();
        deps
    }

    #[tokio::test]
    async fn illegal_action_fails_and_leaves_entity_unchanged() {
        let (buyer, _) = applicant_buyer(EmploymentStatus::Employee);
        let deps = seeded(&buyer).await;
        let admin = Actor::admin(UserId::new(), "ops@example.com");

        let err = run_action(
            &deps.server_deps(),
            buyer.clone(),
            BuyerAction::Approve {
                response: "nope".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ActionError::InvalidAction {
                action: ActionKind::Approve,
                state: State::Created,
            }
        ));
        let stored = deps.store.get(buyer.id).unwrap();
        assert_eq!(stored.state, State::Created);
        assert!(stored.decision_body.is_none());
        assert!(deps.store.recorded_events().is_empty());
    }

    #[tokio::test]
    async fn stranger_is_unauthorized() {
        let (buyer, _) = applicant_buyer(EmploymentStatus::Employee);
        let deps = seeded(&buyer).await;
        let stranger = Actor::applicant(UserId::new(), "mallory@example.com");

        let err = run_action(
            &deps.server_deps(),
            buyer.clone(),
            BuyerAction::Submit,
            AuthMode::Actor(&stranger),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ActionError::Unauthorized { .. }));
        assert_eq!(deps.store.get(buyer.id).unwrap().state, State::Created);
    }

    #[tokio::test]
    async fn employee_submit_then_assign_then_approve() {
        // Full happy path: applicant submits, admin assigns reviewer,
        // admin approves with a response.
        let (buyer, applicant) = applicant_buyer(EmploymentStatus::Employee);
        let deps = seeded(&buyer).await;
        let server_deps = deps.server_deps();
        let admin = Actor::admin(UserId::new(), "ops@example.com");

        let outcome = run_action(
            &server_deps,
            buyer,
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap();
        assert_eq!(outcome.buyer.state, State::AwaitingAssignment);
        assert!(outcome.buyer.submitted_at.is_some());

        let reviewer = UserId::new();
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Assign {
                assignee_id: reviewer,
                assignee_email: "reviewer@example.com".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();
        assert_eq!(outcome.buyer.state, State::ReadyForReview);
        assert_eq!(outcome.buyer.assigned_to_id, Some(reviewer));
        assert!(outcome.note.contains("reviewer@example.com"));

        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Approve {
                response: "LGTM".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();
        assert_eq!(outcome.buyer.state, State::Approved);
        assert_eq!(outcome.buyer.decision_body.as_deref(), Some("LGTM"));
        assert!(outcome.buyer.decided_at.is_some());

        assert_eq!(
            deps.notifications.kinds(),
            vec![NotificationKind::ApplicationApproved]
        );

        // Three actions, three audit rows, in order.
        let events = deps.store.recorded_events();
        assert_eq!(events.len(), 3);
        assert!(events[0].note.contains("submitted"));
        assert!(events[1].note.contains("assigned"));
        assert!(events[2].note.contains("approved"));
        assert!(events.iter().all(|e| e.entity_type == "BuyerApplication"));
    }

    #[tokio::test]
    async fn contractor_submit_requests_manager_approval() {
        let (buyer, applicant) = applicant_buyer(EmploymentStatus::Contractor);
        let deps = seeded(&buyer).await;

        let outcome = run_action(
            &deps.server_deps(),
            buyer,
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap();

        assert_eq!(outcome.buyer.state, State::AwaitingManagerApproval);
        assert!(outcome.buyer.manager_approval_token.is_some());
        assert_eq!(
            deps.notifications.kinds(),
            vec![NotificationKind::ManagerApprovalRequested]
        );
    }

    #[tokio::test]
    async fn contractor_without_manager_email_fails_validation() {
        let (mut buyer, applicant) = applicant_buyer(EmploymentStatus::Contractor);
        buyer.manager_email = None;
        let deps = seeded(&buyer).await;

        let err = run_action(
            &deps.server_deps(),
            buyer.clone(),
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ActionError::Validation {
                field: "manager_email",
                ..
            }
        ));
        assert_eq!(deps.store.get(buyer.id).unwrap().state, State::Created);
    }

    #[tokio::test]
    async fn manager_approval_consumes_token_and_names_manager() {
        let (buyer, applicant) = applicant_buyer(EmploymentStatus::Contractor);
        let deps = seeded(&buyer).await;
        let server_deps = deps.server_deps();

        let outcome = run_action(
            &server_deps,
            buyer,
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap();

        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::ManagerApproval,
            AuthMode::ApprovalToken,
        )
        .await
        .unwrap();

        // Unassigned contractor heads to the assignment queue.
        assert_eq!(outcome.buyer.state, State::AwaitingAssignment);
        assert!(outcome.buyer.manager_approval_token.is_none());
        assert!(outcome.buyer.manager_approved_at.is_some());
        assert!(outcome.note.contains("Grace Hopper"));

        // Token path has no actor, so only the submit wrote an audit row.
        assert_eq!(deps.store.recorded_events().len(), 1);
    }

    #[tokio::test]
    async fn decline_records_rejection_and_notifies() {
        let (buyer, applicant) = applicant_buyer(EmploymentStatus::Employee);
        let deps = seeded(&buyer).await;
        let server_deps = deps.server_deps();
        let admin = Actor::admin(UserId::new(), "ops@example.com");

        let outcome = run_action(
            &server_deps,
            buyer,
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap();
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Assign {
                assignee_id: UserId::new(),
                assignee_email: "reviewer@example.com".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Decline {
                response: "incomplete application".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();

        assert_eq!(outcome.buyer.state, State::Rejected);
        assert_eq!(
            outcome.buyer.decision_body.as_deref(),
            Some("incomplete application")
        );
        assert_eq!(
            deps.notifications.kinds(),
            vec![NotificationKind::ApplicationRejected]
        );

        // Terminal: nothing is legal from rejected.
        let err = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Deactivate,
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ActionError::InvalidAction { .. }));
    }

    #[tokio::test]
    async fn deactivate_then_resubmit() {
        let (buyer, applicant) = applicant_buyer(EmploymentStatus::Employee);
        let deps = seeded(&buyer).await;
        let server_deps = deps.server_deps();
        let admin = Actor::admin(UserId::new(), "ops@example.com");

        let outcome = run_action(
            &server_deps,
            buyer,
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap();
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Assign {
                assignee_id: UserId::new(),
                assignee_email: "reviewer@example.com".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Approve {
                response: "ok".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Deactivate,
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();
        assert_eq!(outcome.buyer.state, State::Deactivated);

        // Re-submission goes back through the guard chain; this one is
        // already assigned, so it skips the queue.
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap();
        assert_eq!(outcome.buyer.state, State::ReadyForReview);
    }

    #[tokio::test]
    async fn failed_commit_rolls_back_everything() {
        let (buyer, applicant) = applicant_buyer(EmploymentStatus::Employee);
        let deps = seeded(&buyer).await;
        deps.store.fail_commits(true);

        let err = run_action(
            &deps.server_deps(),
            buyer.clone(),
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ActionError::Store(StoreError::Unavailable(_))));
        // Neither the transition nor the audit append is observable.
        assert_eq!(deps.store.get(buyer.id).unwrap().state, State::Created);
        assert!(deps.store.recorded_events().is_empty());
        assert!(deps.notifications.sent().is_empty());
    }

    #[tokio::test]
    async fn concurrent_approves_yield_one_winner() {
        let (buyer, applicant) = applicant_buyer(EmploymentStatus::Employee);
        let deps = seeded(&buyer).await;
        let server_deps = deps.server_deps();
        let admin = Actor::admin(UserId::new(), "ops@example.com");

        let outcome = run_action(
            &server_deps,
            buyer,
            BuyerAction::Submit,
            AuthMode::Actor(&applicant),
        )
        .await
        .unwrap();
        let outcome = run_action(
            &server_deps,
            outcome.buyer,
            BuyerAction::Assign {
                assignee_id: UserId::new(),
                assignee_email: "reviewer@example.com".into(),
            },
            AuthMode::Actor(&admin),
        )
        .await
        .unwrap();

        // Both callers read the same ready_for_review snapshot.
        let snapshot = outcome.buyer;
        let (first, second) = tokio::join!(
            run_action(
                &server_deps,
                snapshot.clone(),
                BuyerAction::Approve {
                    response: "first".into()
                },
                AuthMode::Actor(&admin),
            ),
            run_action(
                &server_deps,
                snapshot.clone(),
                BuyerAction::Approve {
                    response: "second".into()
                },
                AuthMode::Actor(&admin),
            ),
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one approve must win");

        let loser = if first.is_ok() { second } else { first };
        match loser.unwrap_err() {
            // The loser sees the post-transition state.
            ActionError::InvalidAction { state, .. } => assert_eq!(state, State::Approved),
            other => panic!("expected InvalidAction, got {other}"),
        }

        assert_eq!(deps.store.get(snapshot.id).unwrap().state, State::Approved);
        assert_eq!(
            deps.notifications.kinds(),
            vec![NotificationKind::ApplicationApproved]
        );
    }
}
