//! MCP server implementation for Fresco.
//!
//! This module defines the `FrescoServer` struct that implements the MCP
//! `ServerHandler` trait, exposing read-only Freshservice operations as tools.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};

use crate::client::FreshClient;
use crate::error::FreshError;
use crate::models::{Agent, Ticket};
use crate::tools::{
    AssignmentHistoryInput, GetAgentIdInput, GetAgentInput, GetTicketInput, ListAgentsInput,
    ListTicketsInput,
};

/// The Fresco MCP server.
///
/// This server exposes Freshservice tickets and agents as MCP tools.
#[derive(Clone)]
pub struct FrescoServer {
    /// Freshservice client for API operations.
    client: FreshClient,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FrescoServer {
    /// Creates a new Fresco server instance.
    pub fn new(client: FreshClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// A simple ping tool to verify the server is running.
    #[tool(description = "Test connectivity to the Fresco MCP server. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    /// Get full details of a single ticket.
    #[tool(description = "Get full details of a single Freshservice ticket by its number. Optionally embed related records with include, e.g. [\"conversations\", \"requester\", \"stats\"].")]
    async fn get_ticket(
        &self,
        Parameters(input): Parameters<GetTicketInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(ticket_id = %input.ticket_id, "get_ticket tool called");

        let include: Vec<&str> = input
            .include
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();

        let ticket = self
            .client
            .get_ticket(&input.ticket_id, &include)
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, ticket_id = %input.ticket_id, "Failed to get ticket");
                format!("Failed to get ticket {}: {}", input.ticket_id, sanitized)
            })?;

        Ok(format_ticket_details(&ticket))
    }

    /// List tickets with constraints or field filters.
    #[tool(description = "List Freshservice tickets. Narrow with predefined_filter (new_and_my_open, watching, spam, deleted), requester_id, requester_email, ticket_type, updated_since, sort order and pagination. Alternatively pass filters (field/value pairs such as priority:4, status:2, agent_id, group_id, tag) or a raw query, joined with filter_logic AND/OR; filters take precedence over the other options.")]
    async fn list_tickets(
        &self,
        Parameters(input): Parameters<ListTicketsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(?input, "list_tickets tool called");

        let tickets = self
            .client
            .get_tickets(&input.to_params())
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, "Failed to list tickets");
                format!("Failed to list tickets: {}", sanitized)
            })?;

        Ok(format_ticket_list(&tickets))
    }

    /// Get a single agent by email or ID.
    #[tool(description = "Get a Freshservice agent by email address or numeric agent ID.")]
    async fn get_agent(
        &self,
        Parameters(input): Parameters<GetAgentInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(lookup = %input.lookup, "get_agent tool called");

        let agent = self.client.get_agent(&input.lookup).await.map_err(|e| {
            let sanitized = self.sanitize_error(&e);
            tracing::error!(error = %sanitized, "Failed to get agent");
            format!("Failed to get agent {}: {}", input.lookup, sanitized)
        })?;

        Ok(format_agent_details(&agent))
    }

    /// List all agents.
    #[tool(description = "List Freshservice agents. Set only_active or only_inactive (not both) to restrict by status. Returns IDs, names and emails.")]
    async fn list_agents(
        &self,
        Parameters(input): Parameters<ListAgentsInput>,
    ) -> Result<String, String> {
        tracing::debug!(?input, "list_agents tool called");

        let agents = self
            .client
            .get_all_agents(
                input.only_active.unwrap_or(false),
                input.only_inactive.unwrap_or(false),
            )
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, "Failed to list agents");
                format!("Failed to list agents: {}", sanitized)
            })?;

        Ok(format_agent_list(&agents))
    }

    /// Resolve an agent email to its ID.
    #[tool(description = "Look up the numeric agent ID for an agent email address.")]
    async fn get_agent_id(
        &self,
        Parameters(input): Parameters<GetAgentIdInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(email = %input.email, "get_agent_id tool called");

        let id = self.client.get_agent_id(&input.email).await.map_err(|e| {
            let sanitized = self.sanitize_error(&e);
            tracing::error!(error = %sanitized, "Failed to resolve agent ID");
            format!("Failed to resolve agent ID for {}: {}", input.email, sanitized)
        })?;

        Ok(format!("Agent {} has ID {}", input.email, id))
    }

    /// Get the assignment history of an agent.
    #[tool(description = "Get the ticket assignment history of an agent given by email address or numeric agent ID. Returns the raw JSON document.")]
    async fn get_assignment_history(
        &self,
        Parameters(input): Parameters<AssignmentHistoryInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(lookup = %input.lookup, "get_assignment_history tool called");

        let history = self
            .client
            .get_assignment_history(&input.lookup)
            .await
            .map_err(|e| {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, "Failed to get assignment history");
                format!(
                    "Failed to get assignment history for {}: {}",
                    input.lookup, sanitized
                )
            })?;

        serde_json::to_string_pretty(&history)
            .map_err(|e| format!("Failed to format assignment history: {}", e))
    }

    /// Sanitizes an error message to remove any API key.
    fn sanitize_error(&self, error: &FreshError) -> String {
        error.sanitized_display(self.client.api_key_for_sanitization())
    }
}

#[tool_handler]
impl ServerHandler for FrescoServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Fresco provides read-only access to Freshservice tickets and agents. \
                 Use list_tickets to find tickets and get_ticket for details. \
                 Use list_agents, get_agent and get_agent_id to look up agents, and \
                 get_assignment_history to see what an agent has been assigned. \
                 Start with 'ping' to verify connectivity."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Response formatting helpers
// ============================================================================

/// Maximum length for description fields before truncation.
const MAX_DESCRIPTION_LENGTH: usize = 2000;

const TRUNCATION_MARKER: &str = "... [truncated]";

/// Truncates text to at most `max_chars` characters, breaking at a word when possible.
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let cut = text
        .char_indices()
        .nth(keep)
        .map_or(text.len(), |(index, _)| index);
    let head = &text[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };

    format!("{}{}", head, TRUNCATION_MARKER)
}

/// Formats a list of tickets as human-readable text.
fn format_ticket_list(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "No tickets found matching the criteria.".to_string();
    }

    let mut output = format!("Found {} ticket(s):\n\n", tickets.len());

    for ticket in tickets {
        output.push_str(&format!("#{} - {}\n", ticket.id, ticket.display_subject()));
        output.push_str(&format!(
            "   Status: {} | Priority: {}\n",
            ticket.display_status(),
            ticket.display_priority()
        ));
        if let Some(responder) = ticket.responder_id {
            output.push_str(&format!("   Agent ID: {}\n", responder));
        }
        if let Some(updated) = &ticket.updated_at {
            output.push_str(&format!("   Updated: {}\n", updated));
        }
        output.push('\n');
    }

    output
}

/// Formats full ticket details as human-readable text.
fn format_ticket_details(ticket: &Ticket) -> String {
    let mut output = format!("Ticket #{}: {}\n", ticket.id, ticket.display_subject());
    output.push_str(&"=".repeat(60));
    output.push('\n');

    output.push_str(&format!("\nStatus: {}\n", ticket.display_status()));
    output.push_str(&format!("Priority: {}\n", ticket.display_priority()));
    if let Some(ticket_type) = &ticket.ticket_type {
        output.push_str(&format!("Type: {}\n", ticket_type));
    }
    if let Some(category) = &ticket.category {
        output.push_str(&format!("Category: {}\n", category));
    }

    if let Some(requester) = ticket.requester_id {
        output.push_str(&format!("\nRequester ID: {}\n", requester));
    }
    if let Some(responder) = ticket.responder_id {
        output.push_str(&format!("Agent ID: {}\n", responder));
    }
    if let Some(group) = ticket.group_id {
        output.push_str(&format!("Group ID: {}\n", group));
    }
    if let Some(tags) = ticket.tags.as_ref().filter(|t| !t.is_empty()) {
        output.push_str(&format!("Tags: {}\n", tags.join(", ")));
    }

    output.push_str("\n--- Timestamps ---\n");
    for (label, value) in [
        ("Created", &ticket.created_at),
        ("Last Updated", &ticket.updated_at),
        ("First Response Due", &ticket.fr_due_by),
        ("Due By", &ticket.due_by),
    ] {
        if let Some(value) = value {
            output.push_str(&format!("{}: {}\n", label, value));
        }
    }

    if let Some(description) = ticket.description_text.as_deref().filter(|d| !d.is_empty()) {
        output.push_str("\n--- Description ---\n");
        output.push_str(&truncate_text(description, MAX_DESCRIPTION_LENGTH));
        output.push('\n');
    }

    output
}

/// Formats a list of agents as human-readable text.
fn format_agent_list(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return "No agents found.".to_string();
    }

    let mut output = format!("Found {} agent(s):\n\n", agents.len());

    for agent in agents {
        output.push_str(&format!("- {} (ID: {})", agent.display_name(), agent.id));
        if let Some(email) = &agent.email {
            output.push_str(&format!(" <{}>", email));
        }
        if !agent.is_active() {
            output.push_str(" [inactive]");
        }
        output.push('\n');
    }

    output
}

/// Formats a single agent as human-readable text.
fn format_agent_details(agent: &Agent) -> String {
    let mut output = format!("Agent #{}: {}\n", agent.id, agent.display_name());

    if let Some(email) = &agent.email {
        output.push_str(&format!("Email: {}\n", email));
    }
    output.push_str(&format!(
        "Status: {}\n",
        if agent.is_active() { "Active" } else { "Inactive" }
    ));
    if let Some(title) = &agent.job_title {
        output.push_str(&format!("Job Title: {}\n", title));
    }
    if let Some(phone) = agent.work_phone_number.as_ref().or(agent.mobile_phone_number.as_ref()) {
        output.push_str(&format!("Phone: {}\n", phone));
    }
    if let Some(last_login) = &agent.last_login_at {
        output.push_str(&format!("Last Login: {}\n", last_login));
    }

    output
}
