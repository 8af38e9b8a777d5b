//! Tool input parameter structs for MCP tools.
//!
//! This module defines the input types for each MCP tool, with
//! JSON Schema derivation for MCP tool discovery.
//!
//! # Input Sanitization
//!
//! All input structs implement `sanitize()` which trims whitespace
//! from string fields. This should be called before processing input.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;

use crate::query::{FieldFilters, Filters, TicketConstraints, TicketListParams};

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Trims every entry of a string list and drops empty ones.
fn trim_list(list: &Option<Vec<String>>) -> Option<Vec<String>> {
    list.as_ref().map(|items| {
        items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

/// Input parameters for the get_ticket tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTicketInput {
    /// The ticket number to retrieve.
    pub ticket_id: String,

    /// Related records to embed, e.g. "conversations", "requester", "stats".
    #[serde(default)]
    pub include: Option<Vec<String>>,
}

impl GetTicketInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            ticket_id: self.ticket_id.trim().to_string(),
            include: trim_list(&self.include),
        }
    }
}

/// A single `field:value` condition for the ticket filter endpoint.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FilterConditionInput {
    /// Field name, e.g. "priority", "status", "agent_id", "group_id", "tag".
    pub field: String,

    /// Value to match, e.g. "4" or "'urgent'".
    pub value: String,
}

/// Input parameters for the list_tickets tool.
///
/// When `filters` or `query` is given the filter endpoint is used and the
/// remaining narrowing options are ignored.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTicketsInput {
    /// Related records to embed, e.g. "stats", "requester".
    #[serde(default)]
    pub include: Option<Vec<String>>,

    /// One of "new_and_my_open", "watching", "spam", "deleted".
    #[serde(default)]
    pub predefined_filter: Option<String>,

    /// Field conditions, combined in the given order with `filter_logic`.
    #[serde(default)]
    pub filters: Option<Vec<FilterConditionInput>>,

    /// A complete filter query such as "priority:4 AND status:2" (used when `filters` is absent).
    #[serde(default)]
    pub query: Option<String>,

    /// "AND" (default) or "OR".
    #[serde(default)]
    pub filter_logic: Option<String>,

    /// Only tickets raised by this requester ID.
    #[serde(default)]
    pub requester_id: Option<String>,

    /// Only tickets raised by this requester email.
    #[serde(default)]
    pub requester_email: Option<String>,

    /// Ticket type, e.g. "Incident" or "Service Request".
    #[serde(default)]
    pub ticket_type: Option<String>,

    /// Only tickets updated since this UTC timestamp (e.g. 2024-01-01T00:00:00Z).
    #[serde(default)]
    pub updated_since: Option<String>,

    /// Sort oldest first.
    #[serde(default)]
    pub ascending: Option<bool>,

    /// Sort newest first (server default).
    #[serde(default)]
    pub descending: Option<bool>,

    /// Results per page (default: 30, max: 100).
    #[serde(default)]
    pub per_page: Option<u32>,

    /// Page number (1-based).
    #[serde(default)]
    pub page: Option<u32>,
}

impl ListTicketsInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            include: trim_list(&self.include),
            predefined_filter: trim_option(&self.predefined_filter),
            filters: self.filters.map(|conditions| {
                conditions
                    .into_iter()
                    .map(|c| FilterConditionInput {
                        field: c.field.trim().to_string(),
                        value: c.value.trim().to_string(),
                    })
                    .filter(|c| !c.field.is_empty())
                    .collect()
            }),
            query: trim_option(&self.query),
            filter_logic: trim_option(&self.filter_logic),
            requester_id: trim_option(&self.requester_id),
            requester_email: trim_option(&self.requester_email),
            ticket_type: trim_option(&self.ticket_type),
            updated_since: trim_option(&self.updated_since),
            ascending: self.ascending,
            descending: self.descending,
            per_page: self.per_page,
            page: self.page,
        }
    }

    /// Converts the input into ticket list parameters.
    pub fn to_params(&self) -> TicketListParams {
        let mut constraints = TicketConstraints::new();

        if let Some(include) = &self.include {
            constraints = constraints.with_include(include.iter().cloned());
        }
        if let Some(filter) = &self.predefined_filter {
            constraints = constraints.with_predefined_filter(filter.as_str());
        }
        if let Some(requester_id) = &self.requester_id {
            constraints = constraints.with_requester_id(requester_id);
        }
        if let Some(email) = &self.requester_email {
            constraints = constraints.with_requester_email(email.as_str());
        }
        if let Some(ticket_type) = &self.ticket_type {
            constraints = constraints.with_ticket_type(ticket_type.as_str());
        }
        if let Some(updated_since) = &self.updated_since {
            constraints = constraints.with_updated_since(updated_since.as_str());
        }
        if self.ascending == Some(true) {
            constraints = constraints.ascending();
        }
        if self.descending == Some(true) {
            constraints = constraints.descending();
        }
        if let Some(per_page) = self.per_page {
            constraints = constraints.with_per_page(per_page.min(100));
        }
        if let Some(page) = self.page {
            constraints = constraints.with_page(page);
        }

        let mut params = TicketListParams::from(constraints);

        let filters = match (&self.filters, &self.query) {
            (Some(conditions), _) if !conditions.is_empty() => Some(Filters::from(
                conditions
                    .iter()
                    .map(|c| (c.field.as_str(), c.value.as_str()))
                    .collect::<FieldFilters>(),
            )),
            (_, Some(query)) => Some(Filters::from(query.as_str())),
            _ => None,
        };
        if let Some(filters) = filters {
            params = params.with_filters(filters);
        }
        if let Some(logic) = &self.filter_logic {
            params = params.with_filter_logic(logic.as_str());
        }

        params
    }
}

/// Input parameters for the get_agent tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetAgentInput {
    /// Agent email address or numeric agent ID.
    pub lookup: String,
}

impl GetAgentInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            lookup: self.lookup.trim().to_string(),
        }
    }
}

/// Input parameters for the list_agents tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListAgentsInput {
    /// Only return active agents.
    #[serde(default)]
    pub only_active: Option<bool>,

    /// Only return inactive agents (cannot be combined with only_active).
    #[serde(default)]
    pub only_inactive: Option<bool>,
}

/// Input parameters for the get_agent_id tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetAgentIdInput {
    /// Agent email address.
    pub email: String,
}

impl GetAgentIdInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
        }
    }
}

/// Input parameters for the get_assignment_history tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AssignmentHistoryInput {
    /// Agent email address or numeric agent ID.
    pub lookup: String,
}

impl AssignmentHistoryInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            lookup: self.lookup.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list_input(json: &str) -> ListTicketsInput {
        serde_json::from_str::<ListTicketsInput>(json).unwrap().sanitize()
    }

    #[test]
    fn test_get_ticket_input_sanitize() {
        let input: GetTicketInput =
            serde_json::from_str(r#"{"ticket_id": " 42 ", "include": [" stats ", " "]}"#).unwrap();
        let input = input.sanitize();
        assert_eq!(input.ticket_id, "42");
        assert_eq!(input.include, Some(vec!["stats".to_string()]));
    }

    #[test]
    fn test_list_tickets_input_constraints() {
        let input = list_input(
            r#"{"requester_email": " a@b.com ", "ticket_type": "Service Request", "per_page": 500, "page": 2}"#,
        );
        assert_eq!(
            input.to_params().to_path_suffix().unwrap(),
            "?requester_email=a%40b.com&type=Service+Request&per_page=100&page=2"
        );
    }

    #[test]
    fn test_list_tickets_input_filters_keep_order() {
        let input = list_input(
            r#"{"filters": [{"field": "status", "value": "2"}, {"field": "priority", "value": "4"}],
                "filter_logic": "or", "per_page": 5}"#,
        );
        assert_eq!(
            input.to_params().to_path_suffix().unwrap(),
            "/filter?query=\"status%3A2+OR+priority%3A4\""
        );
    }

    #[test]
    fn test_list_tickets_input_raw_query() {
        let input = list_input(r#"{"query": "tag:'vip'"}"#);
        assert_eq!(
            input.to_params().to_path_suffix().unwrap(),
            "/filter?query=\"tag%3A%27vip%27\""
        );
    }

    #[test]
    fn test_list_tickets_input_empty() {
        let input = list_input("{}");
        assert_eq!(input.to_params().to_path_suffix().unwrap(), "");
    }

    #[test]
    fn test_agent_inputs_sanitize() {
        let input: GetAgentInput = serde_json::from_str(r#"{"lookup": " 12 "}"#).unwrap();
        assert_eq!(input.sanitize().lookup, "12");
        let input: GetAgentIdInput = serde_json::from_str(r#"{"email": " a@b.c "}"#).unwrap();
        assert_eq!(input.sanitize().email, "a@b.c");
    }
}
