//! Status to handler routing table.

use crate::domain::lead::LeadStatus;

/// Handler family an inbound message is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Greet and ask the first question.
    Start,
    /// Parse the answer to the current question.
    Qualify,
    /// Automation paused for a person.
    Paused,
    /// Yes/no to a guest spot offer.
    TourResponse,
    /// Pick one of the offered appointment slots.
    SlotSelection,
    /// Closed, but a resume keyword starts over.
    Restartable,
    /// Waiting on someone else; reply with fixed copy.
    Informational,
    /// Stored status unreadable; reset through the recovery path.
    Recover,
}

const ROUTE_TABLE: [(LeadStatus, Route); 17] = [
    (LeadStatus::New, Route::Start),
    (LeadStatus::Qualifying, Route::Qualify),
    (LeadStatus::PendingApproval, Route::Informational),
    (LeadStatus::NeedsHumanReply, Route::Paused),
    (LeadStatus::NeedsFollowUp, Route::Informational),
    (LeadStatus::TourOffered, Route::TourResponse),
    (LeadStatus::Waitlisted, Route::Informational),
    (LeadStatus::Rejected, Route::Informational),
    (LeadStatus::AwaitingDeposit, Route::Informational),
    (LeadStatus::DepositPaid, Route::Informational),
    (LeadStatus::AwaitingSlotSelection, Route::SlotSelection),
    (LeadStatus::BookingPending, Route::Informational),
    (LeadStatus::Booked, Route::Informational),
    (LeadStatus::OptedOut, Route::Restartable),
    (LeadStatus::Abandoned, Route::Restartable),
    (LeadStatus::Stale, Route::Restartable),
    (LeadStatus::Unrecognized, Route::Recover),
];

pub fn route_for(status: LeadStatus) -> Route {
    ROUTE_TABLE
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, route)| *route)
        .unwrap_or(Route::Recover)
}
