//! Lead status state machine.
//!
//! The transition table below is the only way a lead's status may
//! change. Handlers ask the table before writing, and the storage layer
//! asks it again under the row lock.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// First contact, nothing asked yet.
    New,

    /// Stepping through the qualification questions.
    Qualifying,

    /// Qualification complete, waiting for the artist to approve.
    PendingApproval,

    /// Automated handling paused; a person replies next.
    NeedsHumanReply,

    /// Soft reject on a business rule, e.g. budget below minimum.
    NeedsFollowUp,

    /// Client is outside the home region and was offered a tour date.
    TourOffered,

    /// Client declined the tour offer.
    Waitlisted,

    Rejected,

    /// Approved; deposit checkout link sent.
    AwaitingDeposit,

    DepositPaid,

    /// Slots offered; waiting for the client to pick one.
    AwaitingSlotSelection,

    /// Client picked a slot; artist confirms the calendar entry.
    BookingPending,

    Booked,

    OptedOut,

    /// Went silent during qualification.
    Abandoned,

    /// Went silent while we were waiting on them after qualification.
    Stale,

    /// Stored value could not be read back. Only the recovery path
    /// writes from here.
    Unrecognized,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 17] = [
        LeadStatus::New,
        LeadStatus::Qualifying,
        LeadStatus::PendingApproval,
        LeadStatus::NeedsHumanReply,
        LeadStatus::NeedsFollowUp,
        LeadStatus::TourOffered,
        LeadStatus::Waitlisted,
        LeadStatus::Rejected,
        LeadStatus::AwaitingDeposit,
        LeadStatus::DepositPaid,
        LeadStatus::AwaitingSlotSelection,
        LeadStatus::BookingPending,
        LeadStatus::Booked,
        LeadStatus::OptedOut,
        LeadStatus::Abandoned,
        LeadStatus::Stale,
        LeadStatus::Unrecognized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Qualifying => "qualifying",
            LeadStatus::PendingApproval => "pending_approval",
            LeadStatus::NeedsHumanReply => "needs_human_reply",
            LeadStatus::NeedsFollowUp => "needs_follow_up",
            LeadStatus::TourOffered => "tour_offered",
            LeadStatus::Waitlisted => "waitlisted",
            LeadStatus::Rejected => "rejected",
            LeadStatus::AwaitingDeposit => "awaiting_deposit",
            LeadStatus::DepositPaid => "deposit_paid",
            LeadStatus::AwaitingSlotSelection => "awaiting_slot_selection",
            LeadStatus::BookingPending => "booking_pending",
            LeadStatus::Booked => "booked",
            LeadStatus::OptedOut => "opted_out",
            LeadStatus::Abandoned => "abandoned",
            LeadStatus::Stale => "stale",
            LeadStatus::Unrecognized => "unrecognized",
        }
    }

    /// Closed conversations only react to the resume keyword.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            LeadStatus::Booked
                | LeadStatus::Rejected
                | LeadStatus::OptedOut
                | LeadStatus::Abandoned
                | LeadStatus::Stale
        )
    }

    /// Statuses an explicit resume keyword restarts from.
    pub fn is_restartable(&self) -> bool {
        matches!(
            self,
            LeadStatus::OptedOut | LeadStatus::Abandoned | LeadStatus::Stale
        )
    }
}

impl StateMachine for LeadStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use LeadStatus::*;
        match self {
            New => vec![Qualifying, NeedsHumanReply, OptedOut, Abandoned],
            Qualifying => vec![
                PendingApproval,
                NeedsHumanReply,
                NeedsFollowUp,
                TourOffered,
                OptedOut,
                Abandoned,
                Stale,
            ],
            PendingApproval => vec![AwaitingDeposit, Rejected, NeedsHumanReply, OptedOut, Stale],
            // A person may move a paused lead anywhere it could have reached.
            NeedsHumanReply => vec![
                Qualifying,
                PendingApproval,
                NeedsFollowUp,
                TourOffered,
                Waitlisted,
                AwaitingDeposit,
                DepositPaid,
                AwaitingSlotSelection,
                BookingPending,
                Booked,
                Rejected,
                OptedOut,
                Abandoned,
                Stale,
            ],
            NeedsFollowUp => vec![PendingApproval, NeedsHumanReply, Rejected, OptedOut, Stale],
            TourOffered => vec![PendingApproval, Waitlisted, NeedsHumanReply, OptedOut, Stale],
            Waitlisted => vec![PendingApproval, NeedsHumanReply, OptedOut, Stale],
            AwaitingDeposit => vec![DepositPaid, NeedsHumanReply, OptedOut, Stale, Rejected],
            DepositPaid => vec![AwaitingSlotSelection, Booked, NeedsHumanReply, OptedOut],
            AwaitingSlotSelection => vec![BookingPending, NeedsHumanReply, OptedOut, Stale],
            BookingPending => vec![Booked, AwaitingSlotSelection, NeedsHumanReply, OptedOut],
            Booked => vec![OptedOut],
            Rejected => vec![OptedOut],
            OptedOut => vec![New],
            Abandoned => vec![New, OptedOut],
            Stale => vec![New, OptedOut],
            Unrecognized => vec![],
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .iter()
            .copied()
            .filter(|status| *status != LeadStatus::Unrecognized)
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("status", format!("unknown status '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_can_start_qualifying() {
        assert!(LeadStatus::New.can_transition_to(&LeadStatus::Qualifying));
        assert_eq!(
            LeadStatus::New.transition_to(LeadStatus::Qualifying),
            Ok(LeadStatus::Qualifying)
        );
    }

    #[test]
    fn new_cannot_jump_to_booked() {
        assert!(!LeadStatus::New.can_transition_to(&LeadStatus::Booked));
        assert!(LeadStatus::New.transition_to(LeadStatus::Booked).is_err());
    }

    #[test]
    fn qualifying_routes_to_every_completion_outcome() {
        for target in [
            LeadStatus::PendingApproval,
            LeadStatus::NeedsFollowUp,
            LeadStatus::TourOffered,
            LeadStatus::NeedsHumanReply,
        ] {
            assert!(LeadStatus::Qualifying.can_transition_to(&target), "{:?}", target);
        }
    }

    #[test]
    fn tour_offer_resolves_to_approval_or_waitlist() {
        assert!(LeadStatus::TourOffered.can_transition_to(&LeadStatus::PendingApproval));
        assert!(LeadStatus::TourOffered.can_transition_to(&LeadStatus::Waitlisted));
    }

    #[test]
    fn deposit_is_only_paid_from_awaiting_deposit() {
        for status in LeadStatus::ALL {
            let allowed = status.can_transition_to(&LeadStatus::DepositPaid);
            let expected = matches!(
                status,
                LeadStatus::AwaitingDeposit | LeadStatus::NeedsHumanReply
            );
            assert_eq!(allowed, expected, "{:?}", status);
        }
    }

    #[test]
    fn every_active_status_can_opt_out() {
        for status in LeadStatus::ALL {
            if matches!(status, LeadStatus::OptedOut | LeadStatus::Unrecognized) {
                continue;
            }
            assert!(status.can_transition_to(&LeadStatus::OptedOut), "{:?}", status);
        }
    }

    #[test]
    fn restartable_statuses_can_return_to_new() {
        for status in LeadStatus::ALL {
            assert_eq!(
                status.can_transition_to(&LeadStatus::New),
                status.is_restartable(),
                "{:?}",
                status
            );
        }
    }

    #[test]
    fn no_status_transitions_to_itself() {
        for status in LeadStatus::ALL {
            assert!(!status.can_transition_to(&status), "{:?}", status);
        }
    }

    #[test]
    fn nothing_transitions_into_unrecognized() {
        for status in LeadStatus::ALL {
            assert!(!status.can_transition_to(&LeadStatus::Unrecognized));
        }
        assert!(LeadStatus::Unrecognized.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in LeadStatus::ALL {
            if status == LeadStatus::Unrecognized {
                continue;
            }
            assert_eq!(status.as_str().parse::<LeadStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_string_fails_to_parse() {
        assert!("booked_twice".parse::<LeadStatus>().is_err());
        assert!("unrecognized".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&LeadStatus::AwaitingSlotSelection).unwrap();
        assert_eq!(json, "\"awaiting_slot_selection\"");
    }
}
