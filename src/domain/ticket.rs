use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::repairs::RepairStatus;

/// Actions that move a ticket out of its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    Accept,
    Complete,
    Cancel,
}

impl TicketAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TicketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How staff actions are checked against the current status.
///
/// `Strict` only allows `pending -> in_progress -> completed`.
/// `Permissive` lets accept and complete run from any status, re-stamping
/// the handler each time. Cancellation is pending-only under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    #[default]
    Strict,
    Permissive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Ticket moves to the given status and is stamped with a handler.
    Advance(RepairStatus),
    /// Ticket is removed.
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: RepairStatus,
    pub action: TicketAction,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} a ticket that is {}", self.action, self.from)
    }
}

impl std::error::Error for InvalidTransition {}

/// Resolves `action` applied to a ticket in status `from`.
pub fn transition(
    policy: TransitionPolicy,
    from: RepairStatus,
    action: TicketAction,
) -> Result<Transition, InvalidTransition> {
    use RepairStatus::{Completed, InProgress, Pending};

    let outcome = match (policy, action, from) {
        (_, TicketAction::Cancel, Pending) => Some(Transition::Withdraw),
        (_, TicketAction::Cancel, _) => None,

        (TransitionPolicy::Strict, TicketAction::Accept, Pending) => {
            Some(Transition::Advance(InProgress))
        }
        (TransitionPolicy::Strict, TicketAction::Complete, InProgress) => {
            Some(Transition::Advance(Completed))
        }
        (TransitionPolicy::Strict, _, _) => None,

        (TransitionPolicy::Permissive, TicketAction::Accept, _) => {
            Some(Transition::Advance(InProgress))
        }
        (TransitionPolicy::Permissive, TicketAction::Complete, _) => {
            Some(Transition::Advance(Completed))
        }
    };

    outcome.ok_or(InvalidTransition { from, action })
}

#[cfg(test)]
mod tests {
    use super::*;
    use RepairStatus::{Completed, InProgress, Pending};

    #[test]
    fn test_strict_forward_path() {
        let p = TransitionPolicy::Strict;
        assert_eq!(
            transition(p, Pending, TicketAction::Accept),
            Ok(Transition::Advance(InProgress))
        );
        assert_eq!(
            transition(p, InProgress, TicketAction::Complete),
            Ok(Transition::Advance(Completed))
        );
    }

    #[test]
    fn test_strict_never_regresses() {
        let p = TransitionPolicy::Strict;
        for action in [TicketAction::Accept, TicketAction::Complete] {
            assert!(transition(p, Completed, action).is_err());
        }
        assert!(transition(p, InProgress, TicketAction::Accept).is_err());
        assert!(transition(p, Pending, TicketAction::Complete).is_err());
    }

    #[test]
    fn test_cancel_only_when_pending() {
        for p in [TransitionPolicy::Strict, TransitionPolicy::Permissive] {
            assert_eq!(
                transition(p, Pending, TicketAction::Cancel),
                Ok(Transition::Withdraw)
            );
            let err = transition(p, InProgress, TicketAction::Cancel).unwrap_err();
            assert_eq!(err.from, InProgress);
            assert_eq!(err.action, TicketAction::Cancel);
            assert!(transition(p, Completed, TicketAction::Cancel).is_err());
        }
    }

    #[test]
    fn test_permissive_allows_any_staff_action() {
        let p = TransitionPolicy::Permissive;
        assert_eq!(
            transition(p, Pending, TicketAction::Complete),
            Ok(Transition::Advance(Completed))
        );
        assert_eq!(
            transition(p, Completed, TicketAction::Accept),
            Ok(Transition::Advance(InProgress))
        );
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = InvalidTransition {
            from: InProgress,
            action: TicketAction::Cancel,
        };
        assert_eq!(err.to_string(), "cannot cancel a ticket that is in_progress");
    }
}
