use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ManutError;
use crate::validate;

/// The four states of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Completed,
        TicketStatus::Cancelled,
    ];

    /// Closed states carry a completion date.
    pub fn is_closed(self) -> bool {
        matches!(self, TicketStatus::Completed | TicketStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "InProgress",
            TicketStatus::Completed => "Completed",
            TicketStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ManutError;

    /// Accepts the English labels and the Portuguese ones used by older
    /// front ends, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "open" | "aberta" => Ok(TicketStatus::Open),
            "inprogress" | "in progress" | "in_progress" | "em andamento" => {
                Ok(TicketStatus::InProgress)
            }
            "completed" | "concluída" | "concluida" => Ok(TicketStatus::Completed),
            "cancelled" | "canceled" | "cancelada" => Ok(TicketStatus::Cancelled),
            _ => Err(ManutError::UnknownStatus(s.to_string())),
        }
    }
}

/// A persisted work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: u32,
    pub opened_on: NaiveDate,
    pub area: String,
    pub status: TicketStatus,
    pub responsible: String,
    pub description: String,
    /// CNPJ of the branch the work order belongs to.
    pub branch: Option<String>,
    pub completed_on: Option<NaiveDate>,
}

impl Ticket {
    /// Builds a freshly opened ticket from a validated draft.
    pub fn open(number: u32, draft: &NewTicket, today: NaiveDate) -> Self {
        Self {
            number,
            opened_on: today,
            area: draft.area.clone(),
            status: TicketStatus::Open,
            responsible: draft.responsible.clone(),
            description: draft.description.clone(),
            branch: draft.branch.clone(),
            completed_on: None,
        }
    }

    /// `completed_on` is set exactly when the status is closed.
    pub fn is_consistent(&self) -> bool {
        self.status.is_closed() == self.completed_on.is_some()
    }
}

/// Caller input for opening a work order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTicket {
    pub area: String,
    pub responsible: String,
    pub description: String,
    pub branch: Option<String>,
}

impl NewTicket {
    pub fn new(
        area: impl Into<String>,
        responsible: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            area: area.into(),
            responsible: responsible.into(),
            description: description.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, cnpj: impl Into<String>) -> Self {
        self.branch = Some(cnpj.into());
        self
    }

    /// Trims text fields, rejects empty ones and normalizes the branch CNPJ.
    pub fn validated(self) -> Result<Self, ManutError> {
        let branch = match self.branch.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(cnpj) => Some(validate::cnpj(cnpj)?),
        };
        Ok(Self {
            area: validate::required("area", &self.area)?,
            responsible: validate::required("responsible", &self.responsible)?,
            description: validate::required("description", &self.description)?,
            branch,
        })
    }
}

/// Row mutation produced by the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: TicketStatus,
    pub completed_on: Option<NaiveDate>,
}

/// A ticket with its references resolved for display or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub branch_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_parse_in_both_languages() {
        assert_eq!("Open".parse::<TicketStatus>().unwrap(), TicketStatus::Open);
        assert_eq!("aberta".parse::<TicketStatus>().unwrap(), TicketStatus::Open);
        assert_eq!(
            "Em Andamento".parse::<TicketStatus>().unwrap(),
            TicketStatus::InProgress
        );
        assert_eq!(
            " in progress ".parse::<TicketStatus>().unwrap(),
            TicketStatus::InProgress
        );
        assert_eq!(
            "Concluída".parse::<TicketStatus>().unwrap(),
            TicketStatus::Completed
        );
        assert_eq!(
            "CANCELED".parse::<TicketStatus>().unwrap(),
            TicketStatus::Cancelled
        );
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "Pausada".parse::<TicketStatus>().unwrap_err();
        assert!(matches!(err, ManutError::UnknownStatus(label) if label == "Pausada"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for status in TicketStatus::ALL {
            assert_eq!(status.to_string().parse::<TicketStatus>().unwrap(), status);
        }
    }

    #[test]
    fn display_honours_width() {
        assert_eq!(format!("[{:<10}]", TicketStatus::Open), "[Open      ]");
        assert_eq!(format!("[{:>12}]", TicketStatus::InProgress), "[  InProgress]");
    }

    #[test]
    fn opened_ticket_is_consistent() {
        let draft = NewTicket::new("Electrical", "A. Silva", "Replace breaker");
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let ticket = Ticket::open(1, &draft, today);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.opened_on, today);
        assert!(ticket.completed_on.is_none());
        assert!(ticket.is_consistent());
    }

    #[test]
    fn draft_validation_trims_and_rejects_blanks() {
        let draft = NewTicket::new("  Hydraulic ", "B. Costa", "Fix leak")
            .with_branch("12.345.678/0001-90")
            .validated()
            .unwrap();
        assert_eq!(draft.area, "Hydraulic");
        assert_eq!(draft.branch.as_deref(), Some("12345678000190"));

        let err = NewTicket::new("Civil", "   ", "Paint wall")
            .validated()
            .unwrap_err();
        assert!(matches!(err, ManutError::Validation(msg) if msg.contains("responsible")));
    }

    #[test]
    fn blank_branch_means_no_branch() {
        let draft = NewTicket::new("Civil", "C. Lima", "Patch roof")
            .with_branch("  ")
            .validated()
            .unwrap();
        assert!(draft.branch.is_none());
    }

    #[test]
    fn view_serializes_flat() {
        let draft = NewTicket::new("Electrical", "A. Silva", "Replace breaker");
        let view = TicketView {
            ticket: Ticket::open(3, &draft, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            branch_name: Some("Matriz".into()),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["number"], 3);
        assert_eq!(json["status"], "Open");
        assert_eq!(json["branch_name"], "Matriz");
        assert!(json["completed_on"].is_null());
    }
}
