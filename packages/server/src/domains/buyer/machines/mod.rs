//! Buyer application state machine
//!
//! Pure decision logic - NO IO. States, the ordered transition table,
//! guards, and the per-state legal action sets live here; everything that
//! touches a database or a clock lives in `actions`.
//!
//! Guards are plain `fn(&Buyer) -> bool` evaluated fresh at every
//! transition attempt. They must never be cached: `assigned_to_id` can be
//! set by a later `assign` action, and the machine has to see the value as
//! it is *now*.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domains::buyer::models::{Buyer, EmploymentStatus};

/// Lifecycle states of a buyer application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "buyer_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum State {
    Created,
    AwaitingManagerApproval,
    AwaitingAssignment,
    ReadyForReview,
    Approved,
    Rejected,
    Deactivated,
}

impl State {
    /// Actions that are legal in this state.
    ///
    /// Checked before any transition is attempted, so an illegal request
    /// fails fast without touching the table. `Deactivated` admits
    /// re-submission through the same guard chain as the initial submit,
    /// plus an idempotent `Deactivate`.
    pub fn valid_actions(self) -> &'static [ActionKind] {
        match self {
            State::Created => &[ActionKind::Submit],
            State::AwaitingManagerApproval => &[ActionKind::ManagerApproval],
            State::AwaitingAssignment => &[ActionKind::Assign],
            State::ReadyForReview => &[ActionKind::Approve, ActionKind::Decline],
            State::Approved => &[ActionKind::Deactivate],
            State::Rejected => &[],
            State::Deactivated => &[ActionKind::Submit, ActionKind::Deactivate],
        }
    }

    pub fn allows(self, action: ActionKind) -> bool {
        self.valid_actions().contains(&action)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Created => "created",
            State::AwaitingManagerApproval => "awaiting_manager_approval",
            State::AwaitingAssignment => "awaiting_assignment",
            State::ReadyForReview => "ready_for_review",
            State::Approved => "approved",
            State::Rejected => "rejected",
            State::Deactivated => "deactivated",
        };
        f.write_str(s)
    }
}

/// The named actions an actor can request.
///
/// Each action maps to exactly one machine event, so the transition table
/// is keyed by `ActionKind` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Submit,
    ManagerApproval,
    Assign,
    Approve,
    Decline,
    Deactivate,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Submit => "submit",
            ActionKind::ManagerApproval => "manager_approval",
            ActionKind::Assign => "assign",
            ActionKind::Approve => "approve",
            ActionKind::Decline => "decline",
            ActionKind::Deactivate => "deactivate",
        };
        f.write_str(s)
    }
}

/// No transition row matched the event in the entity's current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no transition for {event} from state {state}")]
pub struct TransitionError {
    pub event: ActionKind,
    pub state: State,
}

// ============================================================================
// Guards
// ============================================================================

/// Contractors need an extra human-approval hoop before assignment/review.
fn requires_manager_approval(buyer: &Buyer) -> bool {
    buyer.employment_status == Some(EmploymentStatus::Contractor)
}

fn assignee_present(buyer: &Buyer) -> bool {
    buyer.assigned_to_id.is_some()
}

fn unassigned(buyer: &Buyer) -> bool {
    !assignee_present(buyer)
}

// ============================================================================
// Transition table
// ============================================================================

struct Transition {
    event: ActionKind,
    from: &'static [State],
    guard: Option<fn(&Buyer) -> bool>,
    to: State,
}

/// Ordered table: for one event, the first row whose `from` and guard match
/// wins. A pre-assigned application skips the assignment queue.
const TRANSITIONS: &[Transition] = &[
    Transition {
        event: ActionKind::Submit,
        from: &[State::Created, State::Deactivated],
        guard: Some(requires_manager_approval),
        to: State::AwaitingManagerApproval,
    },
    Transition {
        event: ActionKind::Submit,
        from: &[State::Created, State::Deactivated],
        guard: Some(unassigned),
        to: State::AwaitingAssignment,
    },
    Transition {
        event: ActionKind::Submit,
        from: &[State::Created, State::Deactivated],
        guard: Some(assignee_present),
        to: State::ReadyForReview,
    },
    Transition {
        event: ActionKind::ManagerApproval,
        from: &[State::AwaitingManagerApproval],
        guard: Some(unassigned),
        to: State::AwaitingAssignment,
    },
    Transition {
        event: ActionKind::ManagerApproval,
        from: &[State::AwaitingManagerApproval],
        guard: Some(assignee_present),
        to: State::ReadyForReview,
    },
    Transition {
        event: ActionKind::ManagerApproval,
        from: &[State::AwaitingManagerApproval],
        guard: None,
        to: State::Approved,
    },
    Transition {
        event: ActionKind::Assign,
        from: &[State::AwaitingAssignment],
        guard: None,
        to: State::ReadyForReview,
    },
    Transition {
        event: ActionKind::Approve,
        from: &[State::ReadyForReview],
        guard: None,
        to: State::Approved,
    },
    Transition {
        event: ActionKind::Decline,
        from: &[State::ReadyForReview],
        guard: None,
        to: State::Rejected,
    },
    // Deactivate from Deactivated is an explicit idempotent self-loop so
    // that every action the legal set advertises has a transition.
    Transition {
        event: ActionKind::Deactivate,
        from: &[State::Approved, State::Deactivated],
        guard: None,
        to: State::Deactivated,
    },
];

/// Resolve the destination state for an event against the current entity.
///
/// Guards read the entity's mutable fields at call time, so the same event
/// can land differently before and after an out-of-band assignment.
pub fn next_state(event: ActionKind, buyer: &Buyer) -> Result<State, TransitionError> {
    TRANSITIONS
        .iter()
        .filter(|t| t.event == event && t.from.contains(&buyer.state))
        .find(|t| t.guard.map_or(true, |g| g(buyer)))
        .map(|t| t.to)
        .ok_or(TransitionError {
            event,
            state: buyer.state,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::buyer::models::test_fixtures::buyer_in;
    use crate::common::UserId;

    #[test]
    fn submit_routes_contractors_to_manager_approval() {
        let mut buyer = buyer_in(State::Created);
        buyer.employment_status = Some(EmploymentStatus::Contractor);
        // even a pre-assigned contractor goes through manager approval first
        buyer.assigned_to_id = Some(UserId::new());

        assert_eq!(
            next_state(ActionKind::Submit, &buyer).unwrap(),
            State::AwaitingManagerApproval
        );
    }

    #[test]
    fn submit_unassigned_employee_lands_in_assignment_queue() {
        let buyer = buyer_in(State::Created);
        assert_eq!(
            next_state(ActionKind::Submit, &buyer).unwrap(),
            State::AwaitingAssignment
        );
    }

    #[test]
    fn submit_with_assignee_skips_assignment_queue() {
        let mut buyer = buyer_in(State::Created);
        buyer.assigned_to_id = Some(UserId::new());
        assert_eq!(
            next_state(ActionKind::Submit, &buyer).unwrap(),
            State::ReadyForReview
        );
    }

    #[test]
    fn manager_approval_follows_assignment_guards() {
        let mut buyer = buyer_in(State::AwaitingManagerApproval);
        assert_eq!(
            next_state(ActionKind::ManagerApproval, &buyer).unwrap(),
            State::AwaitingAssignment
        );

        buyer.assigned_to_id = Some(UserId::new());
        assert_eq!(
            next_state(ActionKind::ManagerApproval, &buyer).unwrap(),
            State::ReadyForReview
        );
    }

    #[test]
    fn guard_is_evaluated_fresh_not_snapshotted() {
        // Same entity, same event, different outcome after assignment
        // changed out of band.
        let mut buyer = buyer_in(State::AwaitingManagerApproval);
        assert_eq!(
            next_state(ActionKind::ManagerApproval, &buyer).unwrap(),
            State::AwaitingAssignment
        );
        buyer.assigned_to_id = Some(UserId::new());
        assert_eq!(
            next_state(ActionKind::ManagerApproval, &buyer).unwrap(),
            State::ReadyForReview
        );
    }

    #[test]
    fn review_decisions() {
        let buyer = buyer_in(State::ReadyForReview);
        assert_eq!(
            next_state(ActionKind::Approve, &buyer).unwrap(),
            State::Approved
        );
        assert_eq!(
            next_state(ActionKind::Decline, &buyer).unwrap(),
            State::Rejected
        );
    }

    #[test]
    fn deactivate_is_idempotent_from_deactivated() {
        let buyer = buyer_in(State::Deactivated);
        assert_eq!(
            next_state(ActionKind::Deactivate, &buyer).unwrap(),
            State::Deactivated
        );
    }

    #[test]
    fn resubmission_from_deactivated_reuses_submit_guards() {
        let mut buyer = buyer_in(State::Deactivated);
        assert_eq!(
            next_state(ActionKind::Submit, &buyer).unwrap(),
            State::AwaitingAssignment
        );

        buyer.employment_status = Some(EmploymentStatus::Contractor);
        assert_eq!(
            next_state(ActionKind::Submit, &buyer).unwrap(),
            State::AwaitingManagerApproval
        );
    }

    #[test]
    fn rejected_is_terminal() {
        let buyer = buyer_in(State::Rejected);
        assert!(State::Rejected.valid_actions().is_empty());
        for event in [
            ActionKind::Submit,
            ActionKind::ManagerApproval,
            ActionKind::Assign,
            ActionKind::Approve,
            ActionKind::Decline,
            ActionKind::Deactivate,
        ] {
            assert!(next_state(event, &buyer).is_err(), "{event} escaped rejected");
        }
    }

    #[test]
    fn every_advertised_action_has_a_transition() {
        // The legal sets and the table must agree: anything valid_actions
        // advertises resolves to a destination.
        for state in [
            State::Created,
            State::AwaitingManagerApproval,
            State::AwaitingAssignment,
            State::ReadyForReview,
            State::Approved,
            State::Rejected,
            State::Deactivated,
        ] {
            for &action in state.valid_actions() {
                let buyer = buyer_in(state);
                assert!(
                    next_state(action, &buyer).is_ok(),
                    "{action} advertised in {state} but has no transition"
                );
            }
        }
    }

    #[test]
    fn illegal_events_never_transition() {
        for state in [
            State::Created,
            State::AwaitingManagerApproval,
            State::AwaitingAssignment,
            State::ReadyForReview,
            State::Approved,
            State::Rejected,
            State::Deactivated,
        ] {
            for action in [
                ActionKind::Submit,
                ActionKind::ManagerApproval,
                ActionKind::Assign,
                ActionKind::Approve,
                ActionKind::Decline,
                ActionKind::Deactivate,
            ] {
                if !state.allows(action) {
                    let buyer = buyer_in(state);
                    assert!(
                        next_state(action, &buyer).is_err(),
                        "{action} transitioned from {state} despite being illegal"
                    );
                }
            }
        }
    }
}
