//! Freshservice API client.
//!
//! This module provides `FreshClient`, which turns agent and ticket lookups
//! into retried GET requests against the Freshservice v2 REST API.
//!
//! # Security
//!
//! The API key is never logged. All error messages are sanitized before logging.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::FreshError;
use crate::models::{Agent, AgentsEnvelope, Ticket, TicketEnvelope, TicketsEnvelope};
use crate::query::{self, TicketConstraints, TicketListParams};
use crate::requester::{RequestSpec, RetryingRequester};
use crate::transport::{Credentials, Headers, ReqwestTransport, Transport, TransportResponse};

/// How an agent lookup value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentLookup<'a> {
    Email(&'a str),
    Id(&'a str),
}

impl<'a> AgentLookup<'a> {
    /// Emails contain `@`; IDs are all digits; anything else is rejected.
    fn parse(value: &'a str) -> Result<Self, FreshError> {
        let value = value.trim();
        if value.contains('@') {
            Ok(AgentLookup::Email(value))
        } else if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(AgentLookup::Id(value))
        } else {
            Err(FreshError::InvalidField {
                value: value.chars().take(50).collect(),
            })
        }
    }
}

/// Client for the Freshservice API.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = FreshClient::new(&config)?;
///
/// let ticket = client.get_ticket("42", &["requester"]).await?;
/// ```
#[derive(Clone)]
pub struct FreshClient<T = ReqwestTransport> {
    /// Executes requests with retries.
    requester: RetryingRequester<T>,

    /// Base URL ending in `/api/v2/`.
    base_url: String,

    /// API key, kept only to scrub it from error text.
    /// SECURITY: Never log this value!
    api_key: String,
}

impl FreshClient<ReqwestTransport> {
    /// Creates a client using a `reqwest` transport configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns `FreshError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, FreshError> {
        let transport = ReqwestTransport::new(config.timeout, config.verify_ssl)?;
        Ok(Self::with_transport(
            config.base_url.clone(),
            config.api_key(),
            transport,
        ))
    }
}

impl<T: Transport> FreshClient<T> {
    /// Creates a client on top of any transport.
    ///
    /// `base_url` is used verbatim and should end in `/api/v2/`.
    pub fn with_transport(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        transport: T,
    ) -> Self {
        let api_key = api_key.into();
        Self {
            requester: RetryingRequester::new(transport, Credentials::new(api_key.clone())),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// The base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The transport in use.
    pub fn transport(&self) -> &T {
        self.requester.transport()
    }

    /// Returns a reference to the API key for sanitization purposes.
    ///
    /// This should ONLY be used for sanitizing error messages, never for logging.
    pub(crate) fn api_key_for_sanitization(&self) -> &str {
        &self.api_key
    }

    /// Validates that an ID is a numeric string, as expected by the API.
    ///
    /// Prevents path traversal or injection via malformed IDs interpolated into URLs.
    fn validate_id(id: &str, field_name: &str) -> Result<(), FreshError> {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FreshError::validation(format!(
                "{} must be a numeric string, got: {:?}",
                field_name,
                id.chars().take(50).collect::<String>()
            )));
        }
        Ok(())
    }

    /// Tests connectivity to the Freshservice API.
    ///
    /// Lists a single ticket to verify the server is reachable and
    /// authentication is working.
    ///
    /// # Errors
    ///
    /// Returns `FreshError::ConnectionTest` if the connection fails,
    /// with details about the failure reason.
    pub async fn test_connection(&self) -> Result<(), FreshError> {
        tracing::debug!("Testing connection to Freshservice");

        let params = TicketListParams::from(TicketConstraints::new().with_per_page(1));

        match self.get_tickets(&params).await {
            Ok(_) => {
                tracing::info!("Connection test successful");
                Ok(())
            }
            Err(FreshError::Authentication) => Err(FreshError::connection_test(
                "Authentication failed - verify FRESHSERVICE_API_KEY is correct",
            )),
            Err(FreshError::ConnectionExhausted { attempts }) => {
                Err(FreshError::connection_test(format!(
                    "Could not connect after {} attempts - verify FRESHSERVICE_DOMAIN is correct and the server is reachable",
                    attempts
                )))
            }
            Err(e) => Err(FreshError::connection_test(
                e.sanitized_display(&self.api_key),
            )),
        }
    }

    /// Performs a GET against a URI relative to the base URL and decodes the JSON body.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let groups = client.get("groups?per_page=100").await?;
    /// ```
    pub async fn get(&self, uri: &str) -> Result<Value, FreshError> {
        let spec = RequestSpec::new(self.base_url.as_str(), uri);
        self.requester.get_json(&spec).await
    }

    /// Like [`get`](Self::get), sending `headers` in place of the default
    /// `Content-Type: application/json`.
    pub async fn get_with_headers(&self, uri: &str, headers: Headers) -> Result<Value, FreshError> {
        let spec = RequestSpec::new(self.base_url.as_str(), uri).with_headers(headers);
        self.requester.get_json(&spec).await
    }

    /// Performs a GET and returns the response without decoding or status checks.
    pub async fn get_raw(&self, uri: &str) -> Result<TransportResponse, FreshError> {
        let spec = RequestSpec::new(self.base_url.as_str(), uri).raw();
        self.requester.get_raw(&spec).await
    }

    /// Like [`get_raw`](Self::get_raw), sending `headers` in place of the defaults.
    pub async fn get_raw_with_headers(
        &self,
        uri: &str,
        headers: Headers,
    ) -> Result<TransportResponse, FreshError> {
        let spec = RequestSpec::new(self.base_url.as_str(), uri)
            .with_headers(headers)
            .raw();
        self.requester.get_raw(&spec).await
    }

    /// Performs a GET and deserializes the body into `R`.
    async fn get_as<R: DeserializeOwned>(&self, uri: &str) -> Result<R, FreshError> {
        let value = self.get(uri).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Gets a single ticket.
    ///
    /// # Arguments
    ///
    /// * `ticket_id` - The ticket number
    /// * `include` - Embeds to add to the response (e.g. `conversations`, `requester`)
    ///
    /// # Errors
    ///
    /// Returns `FreshError::NotFound` if the ticket doesn't exist.
    pub async fn get_ticket(&self, ticket_id: &str, include: &[&str]) -> Result<Ticket, FreshError> {
        Self::validate_id(ticket_id, "ticket_id")?;

        let suffix = TicketConstraints::new()
            .with_include(include.iter().copied())
            .to_query_string()?;
        let uri = format!("tickets/{}{}", ticket_id, suffix);

        let envelope: TicketEnvelope = self.get_as(&uri).await.map_err(|e| match e {
            FreshError::NotFound { .. } => FreshError::not_found(format!("ticket {}", ticket_id)),
            other => other,
        })?;

        Ok(envelope.ticket)
    }

    /// Lists tickets, optionally narrowed by constraints or filters.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let params = TicketListParams::new()
    ///     .with_filters(FieldFilters::new().with("priority", 4).with("status", 2))
    ///     .with_filter_logic("AND");
    /// let urgent_open = client.get_tickets(&params).await?;
    /// ```
    pub async fn get_tickets(&self, params: &TicketListParams) -> Result<Vec<Ticket>, FreshError> {
        let uri = format!("tickets{}", params.to_path_suffix()?);
        let envelope: TicketsEnvelope = self.get_as(&uri).await?;
        tracing::debug!(
            count = envelope.tickets.len(),
            total = ?envelope.total,
            "Listed tickets"
        );
        Ok(envelope.tickets)
    }

    /// Gets an agent by email address or numeric ID.
    ///
    /// Both lookup styles return the same record shape.
    ///
    /// # Errors
    ///
    /// - `FreshError::InvalidField` if `lookup` is neither an email nor numeric
    /// - `FreshError::NotFound` if no agent matches
    pub async fn get_agent(&self, lookup: &str) -> Result<Agent, FreshError> {
        match AgentLookup::parse(lookup)? {
            AgentLookup::Email(email) => self.find_agent_by_email(email).await,
            AgentLookup::Id(id) => {
                let value = self.get_user_info(id).await?;
                Ok(serde_json::from_value(unwrap_envelope(value, "agent"))?)
            }
        }
    }

    /// Gets the raw agent document for an agent ID, envelope included.
    pub async fn get_user_info(&self, agent_id: &str) -> Result<Value, FreshError> {
        Self::validate_id(agent_id, "agent_id")?;
        self.get(&format!("agents/{}", agent_id))
            .await
            .map_err(|e| match e {
                FreshError::NotFound { .. } => FreshError::not_found(format!("agent {}", agent_id)),
                other => other,
            })
    }

    /// Lists agents, optionally only active or only inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `FreshError::InvalidFilter` if both flags are set; no request is made.
    pub async fn get_all_agents(
        &self,
        only_active: bool,
        only_inactive: bool,
    ) -> Result<Vec<Agent>, FreshError> {
        let suffix = query::active_agents_query(only_active, only_inactive)?;
        let envelope: AgentsEnvelope = self.get_as(&format!("agents{}", suffix)).await?;
        Ok(envelope.agents)
    }

    /// Resolves an agent's email address to its ID.
    ///
    /// # Errors
    ///
    /// Returns `FreshError::NotFound` if no agent has this email.
    pub async fn get_agent_id(&self, email: &str) -> Result<u64, FreshError> {
        match AgentLookup::parse(email)? {
            AgentLookup::Email(email) => Ok(self.find_agent_by_email(email).await?.id),
            AgentLookup::Id(_) => Err(FreshError::InvalidField {
                value: email.trim().to_string(),
            }),
        }
    }

    /// Gets the ticket assignment history of an agent given by email or ID.
    pub async fn get_assignment_history(&self, lookup: &str) -> Result<Value, FreshError> {
        let agent_id = match AgentLookup::parse(lookup)? {
            AgentLookup::Email(email) => self.find_agent_by_email(email).await?.id.to_string(),
            AgentLookup::Id(id) => id.to_string(),
        };

        self.get(&format!("users/{}/assignment-history", agent_id))
            .await
            .map_err(|e| match e {
                FreshError::NotFound { .. } => {
                    FreshError::not_found(format!("assignment history for agent {}", agent_id))
                }
                other => other,
            })
    }

    /// Looks up an agent by email and returns the first match.
    async fn find_agent_by_email(&self, email: &str) -> Result<Agent, FreshError> {
        let uri = format!("agents{}", query::email_lookup_query(email));
        let not_found = || FreshError::not_found(format!("agent with email {}", email));

        let envelope: AgentsEnvelope = self.get_as(&uri).await.map_err(|e| match e {
            FreshError::NotFound { .. } => not_found(),
            other => other,
        })?;

        envelope.agents.into_iter().next().ok_or_else(not_found)
    }
}

/// Returns the value under `key` when `value` is an object holding it, else `value` itself.
fn unwrap_envelope(mut value: Value, key: &str) -> Value {
    if let Value::Object(map) = &mut value {
        if let Some(inner) = map.remove(key) {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use reqwest::StatusCode;
    use serde_json::json;

    use crate::query::FieldFilters;
    use crate::transport::TransportError;

    /// Transport that records URLs and answers from a queue of bodies.
    #[derive(Default)]
    struct RecordingTransport {
        responses: Mutex<VecDeque<(StatusCode, String)>>,
        urls: Mutex<Vec<String>>,
    }

    impl RecordingTransport {
        fn with_responses(responses: &[(StatusCode, Value)]) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .iter()
                        .map(|(status, body)| (*status, body.to_string()))
                        .collect(),
                ),
                urls: Mutex::new(Vec::new()),
            }
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        async fn get(
            &self,
            url: &str,
            _headers: &Headers,
            _credentials: &Credentials,
        ) -> Result<TransportResponse, TransportError> {
            self.urls.lock().unwrap().push(url.to_string());
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((StatusCode::OK, "{}".to_string()));
            Ok(TransportResponse::new(status, body))
        }
    }

    const BASE: &str = "https://acme.freshservice.com/api/v2/";

    fn client(responses: &[(StatusCode, Value)]) -> FreshClient<RecordingTransport> {
        FreshClient::with_transport(BASE, "test_key", RecordingTransport::with_responses(responses))
    }

    #[test]
    fn test_agent_lookup_parse() {
        assert_eq!(AgentLookup::parse("a@b.com").unwrap(), AgentLookup::Email("a@b.com"));
        assert_eq!(AgentLookup::parse(" 123 ").unwrap(), AgentLookup::Id("123"));
        assert!(matches!(
            AgentLookup::parse("bob"),
            Err(FreshError::InvalidField { ref value }) if value == "bob"
        ));
        assert!(AgentLookup::parse("").is_err());
        assert!(AgentLookup::parse("-1").is_err());
    }

    #[test]
    fn test_validate_id() {
        type Client = FreshClient<RecordingTransport>;
        assert!(Client::validate_id("12345", "id").is_ok());
        assert!(Client::validate_id("", "id").is_err());
        assert!(Client::validate_id("../etc/passwd", "id").is_err());
        assert!(Client::validate_id("12 34", "id").is_err());
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({"agent": {"id": 1}}), "agent"), json!({"id": 1}));
        assert_eq!(unwrap_envelope(json!({"id": 1}), "agent"), json!({"id": 1}));
        assert_eq!(unwrap_envelope(json!([1]), "agent"), json!([1]));
    }

    #[tokio::test]
    async fn test_get_ticket_with_include() {
        let client = client(&[(StatusCode::OK, json!({"ticket": {"id": 42, "subject": "Hi"}}))]);

        let ticket = client.get_ticket("42", &["requester", "stats"]).await.unwrap();

        assert_eq!(ticket.id, 42);
        assert_eq!(
            client.transport().urls(),
            vec![format!("{}tickets/42?include=requester,stats", BASE)]
        );
    }

    #[tokio::test]
    async fn test_get_ticket_not_found_names_ticket() {
        let client = client(&[(StatusCode::NOT_FOUND, json!({"message": "not found"}))]);
        let err = client.get_ticket("9", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "not found: ticket 9");
    }

    #[tokio::test]
    async fn test_get_ticket_rejects_bad_id_without_request() {
        let client = client(&[]);
        assert!(client.get_ticket("1/../2", &[]).await.is_err());
        assert!(client.transport().urls().is_empty());
    }

    #[tokio::test]
    async fn test_get_tickets_with_filters() {
        let client = client(&[(StatusCode::OK, json!({"tickets": [{"id": 1}], "total": 1}))]);
        let params = TicketListParams::new()
            .with_filters(FieldFilters::new().with("priority", "high").with("status", "open"))
            .with_filter_logic("OR");

        let tickets = client.get_tickets(&params).await.unwrap();

        assert_eq!(tickets.len(), 1);
        assert_eq!(
            client.transport().urls(),
            vec![format!("{}tickets/filter?query=\"priority%3Ahigh+OR+status%3Aopen\"", BASE)]
        );
    }

    #[tokio::test]
    async fn test_get_tickets_invalid_predefined_filter_makes_no_request() {
        let client = client(&[]);
        let params = TicketListParams::from(TicketConstraints::new().with_predefined_filter("mine"));
        let err = client.get_tickets(&params).await.unwrap_err();
        assert!(matches!(err, FreshError::InvalidPredefinedFilter { .. }));
        assert!(client.transport().urls().is_empty());
    }

    #[tokio::test]
    async fn test_get_agent_by_email_takes_first() {
        let client = client(&[(
            StatusCode::OK,
            json!({"agents": [{"id": 5, "email": "a@b.com"}, {"id": 6}]}),
        )]);

        let agent = client.get_agent("a@b.com").await.unwrap();

        assert_eq!(agent.id, 5);
        assert_eq!(client.transport().urls(), vec![format!("{}agents?email=a%40b.com", BASE)]);
    }

    #[tokio::test]
    async fn test_get_agent_by_id_unwraps_envelope() {
        let client = client(&[(StatusCode::OK, json!({"agent": {"id": 77, "first_name": "Ada"}}))]);

        let agent = client.get_agent("77").await.unwrap();

        assert_eq!(agent.id, 77);
        assert_eq!(agent.display_name(), "Ada");
        assert_eq!(client.transport().urls(), vec![format!("{}agents/77", BASE)]);
    }

    #[tokio::test]
    async fn test_get_agent_invalid_lookup() {
        let client = client(&[]);
        let err = client.get_agent("not-an-id").await.unwrap_err();
        assert!(matches!(err, FreshError::InvalidField { .. }));
        assert!(client.transport().urls().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_agents_flags() {
        let client = client(&[
            (StatusCode::OK, json!({"agents": [{"id": 1}]})),
            (StatusCode::OK, json!({"agents": []})),
            (StatusCode::OK, json!({"agents": []})),
        ]);

        assert_eq!(client.get_all_agents(true, false).await.unwrap().len(), 1);
        client.get_all_agents(false, true).await.unwrap();
        client.get_all_agents(false, false).await.unwrap();

        assert_eq!(
            client.transport().urls(),
            vec![
                format!("{}agents?active=true", BASE),
                format!("{}agents?active=false", BASE),
                format!("{}agents", BASE),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_all_agents_conflicting_flags_makes_no_request() {
        let client = client(&[]);
        let err = client.get_all_agents(true, true).await.unwrap_err();
        assert!(matches!(err, FreshError::InvalidFilter(_)));
        assert!(client.transport().urls().is_empty());
    }

    #[tokio::test]
    async fn test_get_agent_id_empty_result_is_not_found() {
        let client = client(&[(StatusCode::OK, json!({"agents": []}))]);
        let err = client.get_agent_id("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, FreshError::NotFound { .. }));
        assert!(err.to_string().contains("ghost@example.com"));
    }

    #[tokio::test]
    async fn test_get_agent_id_404_is_not_found() {
        let client = client(&[(StatusCode::NOT_FOUND, json!({}))]);
        let err = client.get_agent_id("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, FreshError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_agent_id_requires_email() {
        let client = client(&[]);
        assert!(matches!(
            client.get_agent_id("123").await,
            Err(FreshError::InvalidField { .. })
        ));
    }

    #[tokio::test]
    async fn test_assignment_history_by_email_resolves_id_first() {
        let client = client(&[
            (StatusCode::OK, json!({"agents": [{"id": 31}]})),
            (StatusCode::OK, json!({"assignment_history": []})),
        ]);

        let history = client.get_assignment_history("x@y.io").await.unwrap();

        assert_eq!(history, json!({"assignment_history": []}));
        assert_eq!(
            client.transport().urls(),
            vec![
                format!("{}agents?email=x%40y.io", BASE),
                format!("{}users/31/assignment-history", BASE),
            ]
        );
    }

    #[tokio::test]
    async fn test_assignment_history_by_id() {
        let client = client(&[(StatusCode::OK, json!({"assignment_history": []}))]);
        client.get_assignment_history("31").await.unwrap();
        assert_eq!(
            client.transport().urls(),
            vec![format!("{}users/31/assignment-history", BASE)]
        );
    }

    #[tokio::test]
    async fn test_get_raw_returns_error_status_untouched() {
        let client = client(&[(StatusCode::TOO_MANY_REQUESTS, json!({"message": "slow down"}))]);
        let response = client.get_raw("tickets").await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_connection_reports_authentication() {
        let client = client(&[(StatusCode::UNAUTHORIZED, json!({}))]);
        let err = client.test_connection().await.unwrap_err();
        assert!(err.to_string().contains("FRESHSERVICE_API_KEY"));
        assert_eq!(
            client.transport().urls(),
            vec![format!("{}tickets?per_page=1", BASE)]
        );
    }
}
