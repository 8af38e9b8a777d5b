//! Agent models for the Freshservice API.
//!
//! Agents are the staff users tickets get assigned to. Lookups by ID and by
//! email return different envelopes; both are normalised to [`Agent`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Freshservice agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent ID (also the user ID).
    pub id: u64,

    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,

    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,

    /// Primary email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Whether the agent account is active.
    #[serde(default)]
    pub active: Option<bool>,

    /// Job title.
    #[serde(default)]
    pub job_title: Option<String>,

    /// Work phone number.
    #[serde(default)]
    pub work_phone_number: Option<String>,

    /// Mobile phone number.
    #[serde(default)]
    pub mobile_phone_number: Option<String>,

    /// Departments the agent belongs to.
    #[serde(default)]
    pub department_ids: Option<Vec<u64>>,

    /// Location ID.
    #[serde(default)]
    pub location_id: Option<u64>,

    /// Last login timestamp.
    #[serde(default)]
    pub last_login_at: Option<String>,

    /// Every other field returned by the API.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Agent {
    /// Returns the full name, falling back to email or ID.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !name.is_empty() {
            name
        } else if let Some(email) = &self.email {
            email.clone()
        } else {
            self.id.to_string()
        }
    }

    /// Returns true unless the API marks the agent inactive.
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }
}

/// Response wrapper for agent listings and email lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentsEnvelope {
    /// Matching agents.
    #[serde(default)]
    pub agents: Vec<Agent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(first: Option<&str>, last: Option<&str>, email: Option<&str>) -> Agent {
        Agent {
            id: 7,
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            email: email.map(String::from),
            active: None,
            job_title: None,
            work_phone_number: None,
            mobile_phone_number: None,
            department_ids: None,
            location_id: None,
            last_login_at: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_agent_display_name() {
        assert_eq!(agent(Some("Ada"), Some("Lovelace"), None).display_name(), "Ada Lovelace");
        assert_eq!(agent(Some("Ada"), None, None).display_name(), "Ada");
    }

    #[test]
    fn test_agent_display_name_fallbacks() {
        assert_eq!(agent(None, None, Some("ada@example.com")).display_name(), "ada@example.com");
        assert_eq!(agent(Some(""), None, None).display_name(), "7");
    }

    #[test]
    fn test_agent_deserialize() {
        let json = r#"{
            "id": 456,
            "first_name": "Jane",
            "last_name": "Smith",
            "email": "jane@example.com",
            "active": false,
            "department_ids": [1, 2],
            "time_zone": "Eastern Time (US & Canada)"
        }"#;
        let agent: Agent = serde_json::from_str(json).unwrap();
        assert_eq!(agent.id, 456);
        assert_eq!(agent.display_name(), "Jane Smith");
        assert!(!agent.is_active());
        assert_eq!(agent.department_ids, Some(vec![1, 2]));
        assert_eq!(agent.extra["time_zone"], "Eastern Time (US & Canada)");
    }

    #[test]
    fn test_agents_envelope_empty() {
        let envelope: AgentsEnvelope = serde_json::from_str(r#"{"agents": []}"#).unwrap();
        assert!(envelope.agents.is_empty());
    }
}
