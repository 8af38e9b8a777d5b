//! Ticket models for the Freshservice API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Freshservice ticket.
///
/// Status, priority and source are numeric codes in the API; use the
/// `display_*` helpers for their names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket ID (the ticket number shown in the UI).
    pub id: u64,

    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,

    /// Plain-text description.
    #[serde(default)]
    pub description_text: Option<String>,

    /// Status code (2 open, 3 pending, 4 resolved, 5 closed).
    #[serde(default)]
    pub status: Option<u32>,

    /// Priority code (1 low to 4 urgent).
    #[serde(default)]
    pub priority: Option<u32>,

    /// Channel the ticket came in through.
    #[serde(default)]
    pub source: Option<u32>,

    /// Ticket type, e.g. "Incident" or "Service Request".
    #[serde(default, rename = "type")]
    pub ticket_type: Option<String>,

    /// Requester's user ID.
    #[serde(default)]
    pub requester_id: Option<u64>,

    /// Assigned agent's ID.
    #[serde(default)]
    pub responder_id: Option<u64>,

    /// Assigned group's ID.
    #[serde(default)]
    pub group_id: Option<u64>,

    /// Category name.
    #[serde(default)]
    pub category: Option<String>,

    /// Resolution due timestamp.
    #[serde(default)]
    pub due_by: Option<String>,

    /// First response due timestamp.
    #[serde(default)]
    pub fr_due_by: Option<String>,

    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,

    /// Tags attached to the ticket.
    #[serde(default)]
    pub tags: Option<Vec<String>>,

    /// Every other field returned by the API, including embedded includes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ticket {
    /// Returns the subject or a placeholder.
    pub fn display_subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("(No subject)")
    }

    /// Returns the status name for the status code.
    pub fn display_status(&self) -> &'static str {
        match self.status {
            Some(2) => "Open",
            Some(3) => "Pending",
            Some(4) => "Resolved",
            Some(5) => "Closed",
            Some(_) => "Custom",
            None => "Unknown",
        }
    }

    /// Returns the priority name for the priority code.
    pub fn display_priority(&self) -> &'static str {
        match self.priority {
            Some(1) => "Low",
            Some(2) => "Medium",
            Some(3) => "High",
            Some(4) => "Urgent",
            _ => "Unknown",
        }
    }
}

/// Response wrapper for a single ticket.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketEnvelope {
    /// The ticket.
    pub ticket: Ticket,
}

/// Response wrapper for ticket listings and filter queries.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketsEnvelope {
    /// Tickets on this page.
    #[serde(default)]
    pub tickets: Vec<Ticket>,

    /// Total matches (filter queries only).
    #[serde(default)]
    pub total: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_deserialize() {
        let json = r#"{
            "id": 42,
            "subject": "Printer on fire",
            "status": 2,
            "priority": 4,
            "type": "Incident",
            "requester_id": 1001,
            "responder_id": null,
            "tags": ["hardware"],
            "custom_fields": {"floor": 3}
        }"#;
        let ticket: Ticket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.id, 42);
        assert_eq!(ticket.display_subject(), "Printer on fire");
        assert_eq!(ticket.display_status(), "Open");
        assert_eq!(ticket.display_priority(), "Urgent");
        assert_eq!(ticket.ticket_type.as_deref(), Some("Incident"));
        assert_eq!(ticket.responder_id, None);
        assert_eq!(ticket.extra["custom_fields"]["floor"], 3);
    }

    #[test]
    fn test_ticket_minimal() {
        let ticket: Ticket = serde_json::from_str(r#"{"id": 1, "tags": null}"#).unwrap();
        assert_eq!(ticket.display_subject(), "(No subject)");
        assert_eq!(ticket.display_status(), "Unknown");
        assert_eq!(ticket.display_priority(), "Unknown");
        assert!(ticket.tags.is_none());
    }

    #[test]
    fn test_tickets_envelope() {
        let json = r#"{"tickets": [{"id": 1}, {"id": 2}], "total": 2}"#;
        let envelope: TicketsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.tickets.len(), 2);
        assert_eq!(envelope.total, Some(2));
    }
}
