use chrono::NaiveDate;
use serde::Serialize;

use super::ticket::{StatusUpdate, Ticket, TicketStatus};
use crate::error::ManutError;

/// Record of an applied status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub number: u32,
    pub from: TicketStatus,
    pub to: TicketStatus,
    pub completed_on: Option<NaiveDate>,
}

/// Validates and applies ticket status changes.
///
/// Every state is reachable from every other one, including itself. The only
/// rule is how the completion date follows the target status:
///
/// - `Completed` and `Cancelled` stamp the completion date with `today`.
/// - `Open` and `InProgress` clear it, even when a ticket is being reopened.
/// - Re-applying the current status re-runs the same rule.
pub struct LifecycleEngine;

impl LifecycleEngine {
    /// Parses a status label before anything touches the store.
    pub fn parse(label: &str) -> Result<TicketStatus, ManutError> {
        label.parse()
    }

    /// Computes the row mutation for moving to `to` on `today`.
    pub fn plan(to: TicketStatus, today: NaiveDate) -> StatusUpdate {
        StatusUpdate {
            status: to,
            completed_on: to.is_closed().then_some(today),
        }
    }

    /// Applies the transition to an in-memory copy of the ticket.
    pub fn apply(ticket: &mut Ticket, to: TicketStatus, today: NaiveDate) -> Transition {
        let update = Self::plan(to, today);
        let from = ticket.status;
        ticket.status = update.status;
        ticket.completed_on = update.completed_on;
        Transition {
            number: ticket.number,
            from,
            to,
            completed_on: ticket.completed_on,
        }
    }
}
