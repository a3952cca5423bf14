//! Outbound message text.
//!
//! Fixed English copy. Prompts for the same question differ between the
//! first ask and a repair so the client can tell they are being re-asked.

use crate::domain::lead::{format_pence, LeadStatus, ParseField, QuestionKey};
use crate::domain::parsing::{TimeSlot, WrongField};

pub const GREETING: &str =
    "Hi! Thanks for getting in touch about a tattoo. I'll ask a few quick questions so the artist has everything they need.";

pub const OPTED_OUT: &str =
    "You won't receive any more messages from us. Reply START at any time to begin again.";

pub const HANDOFF: &str =
    "Thanks for bearing with me. I'll pass this to the artist and a person will follow up with you shortly.";

pub const HOLDING_REPLY: &str =
    "Thanks for your message. The artist will reply personally as soon as they can. Reply CONTINUE to carry on with the questions.";

pub const BUNDLE: &str =
    "Thanks! It looks like that answers a few questions at once. Could you answer just the one I asked, one at a time?";

pub const EMPTY_ANSWER: &str = "Sorry, I didn't catch that. Could you reply with some text?";

pub const TOUR_ACCEPTED: &str =
    "Great, I've passed your request to the artist for approval. You'll hear back soon.";

pub const TOUR_DECLINED: &str =
    "No problem, I've added you to the waitlist and we'll be in touch if the artist is in your area.";

pub const TOUR_REPROMPT: &str = "Would a guest spot date near you work? Please reply YES or NO.";

pub const SLOT_CONFIRMED_PREFIX: &str = "Lovely, I've asked the artist to confirm";

/// Prompt asking `key` for the first time.
pub fn question_prompt(key: QuestionKey) -> &'static str {
    match key {
        QuestionKey::Idea => "What would you like to get tattooed? Describe your idea in a sentence or two.",
        QuestionKey::Placement => "Where on your body would you like it?",
        QuestionKey::Dimensions => "Roughly how big should it be? For example 10x15cm or 4 inches.",
        QuestionKey::Style => "What style are you after? Fine line, blackwork, traditional, something else?",
        QuestionKey::Budget => "What's your budget for this piece?",
        QuestionKey::Location => "Which city and country are you based in?",
        QuestionKey::Timing => "When are you hoping to get it done?",
    }
}

/// Clarifying re-ask after `field` failed to parse.
pub fn repair_prompt(field: ParseField) -> &'static str {
    match field {
        ParseField::Dimensions => {
            "Sorry, I couldn't read that size. Please give width and height with a unit, like 10x15cm or 4x6 inches."
        }
        ParseField::Budget => "Sorry, I couldn't read that budget. Please reply with an amount, like £400.",
        ParseField::Location => "Sorry, which city and country are you in? For example Leeds, UK.",
        ParseField::Slot => {
            "Sorry, I couldn't tell which slot you meant. Please reply with the number of one option, like 2."
        }
    }
}

/// Re-ask when a free-text answer looks like it belongs to another question.
pub fn wrong_field_prompt(key: QuestionKey, looks_like: WrongField) -> String {
    format!(
        "That looks like a {} rather than an answer to this one. {}",
        match looks_like {
            WrongField::Dimensions => "size",
            WrongField::Budget => "budget",
        },
        question_prompt(key)
    )
}

pub fn tour_offer(country: Option<&str>) -> String {
    match country {
        Some(country) => format!(
            "The artist doesn't work in {} full time, but does guest spots there. Would a guest spot date work for you? Reply YES or NO.",
            country
        ),
        None => TOUR_REPROMPT.to_string(),
    }
}

/// Reply when qualification completes, by the status it routed to.
pub fn completion_reply(status: LeadStatus, min_budget_pence: i64) -> String {
    match status {
        LeadStatus::NeedsFollowUp => format!(
            "Thanks for all of that. The artist's minimum for a piece is {}, so they'll be in touch to talk options.",
            format_pence(min_budget_pence)
        ),
        _ => "Thanks, that's everything! I've sent your request to the artist for review.".to_string(),
    }
}

pub fn slot_offer(slots: &[TimeSlot]) -> String {
    let mut lines = vec!["Here are the available appointments. Reply with the number you'd like:".to_string()];
    for (i, slot) in slots.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, slot.label()));
    }
    lines.join("\n")
}

pub fn slot_confirmed(slot: &TimeSlot) -> String {
    format!("{} {}. You'll get a confirmation shortly.", SLOT_CONFIRMED_PREFIX, slot.label())
}

pub fn deposit_request(amount_pence: i64, checkout_url: &str) -> String {
    format!(
        "Good news, the artist would love to do this! To secure your booking please pay the {} deposit here: {}",
        format_pence(amount_pence),
        checkout_url
    )
}

pub const DEPOSIT_RECEIVED: &str = "Deposit received, thank you! We'll send appointment options shortly.";

pub const REJECTED: &str =
    "Thanks so much for your interest. Unfortunately the artist isn't able to take this piece on.";

pub fn booked(slot: Option<&TimeSlot>) -> String {
    match slot {
        Some(slot) => format!("You're booked in for {}. See you then!", slot.label()),
        None => "You're booked in. See you then!".to_string(),
    }
}

/// Fixed reply for statuses that only wait on someone else.
pub fn status_info(status: LeadStatus) -> Option<&'static str> {
    match status {
        LeadStatus::PendingApproval => {
            Some("Thanks! Your request is with the artist and you'll hear back soon.")
        }
        LeadStatus::NeedsFollowUp => Some("Thanks! The artist will be in touch to talk through options."),
        LeadStatus::Waitlisted => Some("You're on the waitlist. We'll message you if a date comes up near you."),
        LeadStatus::AwaitingDeposit => {
            Some("Your booking is held until the deposit is paid. Use the link we sent to pay.")
        }
        LeadStatus::DepositPaid => Some("Deposit received. Appointment options are on their way."),
        LeadStatus::BookingPending => Some("The artist is confirming your appointment. Hang tight!"),
        LeadStatus::Booked => Some("You're all booked in. Message the studio if anything changes."),
        LeadStatus::Rejected => {
            Some("Thanks again for your interest. The studio will be in touch if anything changes.")
        }
        LeadStatus::Abandoned | LeadStatus::Stale => {
            Some("It's been a while! Reply START to begin a new request.")
        }
        _ => None,
    }
}
