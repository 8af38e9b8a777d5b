//! Query-string construction for list endpoints.
//!
//! Two independent paths exist for ticket listings:
//! - [`TicketConstraints`] compiles to a `?a=b&c=d` query string
//! - [`Filters`] compiles to a `/filter?query="..."` path suffix
//!
//! [`TicketListParams`] chooses between them; filters win when present.

use std::fmt;
use std::str::FromStr;

use crate::error::FreshError;

/// Named filter shortcuts the tickets endpoint understands.
pub const VALID_PREDEFINED_FILTERS: [&str; 4] = ["new_and_my_open", "watching", "spam", "deleted"];

/// Fields the ticket filter endpoint documents as filterable.
pub const SUPPORTED_FILTER_FIELDS: [&str; 10] = [
    "agent_id",
    "group_id",
    "priority",
    "status",
    "impact",
    "urgency",
    "tag",
    "due_by",
    "fr_due_by",
    "created_at",
];

/// Appends `appendage` to a query string.
///
/// The first term gets a `?` prefix, later terms are joined with `&`. An
/// appendage that already starts with `?` is used as is when nothing precedes it.
pub fn construct_query_string(existing: &str, appendage: &str) -> String {
    if appendage.is_empty() {
        existing.to_string()
    } else if existing == "?" {
        format!("?{}", appendage)
    } else if !existing.is_empty() {
        format!("{}&{}", existing, appendage)
    } else if appendage.starts_with('?') {
        appendage.to_string()
    } else {
        format!("?{}", appendage)
    }
}

/// Form-encodes a string: percent-encoding with spaces as `+`.
pub fn url_encode(raw: &str) -> String {
    urlencoding::encode(raw).replace("%20", "+")
}

/// Query string for looking up agents by email.
pub fn email_lookup_query(email: &str) -> String {
    construct_query_string("", &format!("email={}", url_encode(email)))
}

/// Query string restricting an agent listing by activity.
///
/// # Errors
///
/// Returns `FreshError::InvalidFilter` if both flags are set.
pub fn active_agents_query(only_active: bool, only_inactive: bool) -> Result<&'static str, FreshError> {
    match (only_active, only_inactive) {
        (true, true) => Err(FreshError::InvalidFilter(
            "You cannot use both the only_active and only_inactive filters in the same call."
                .to_string(),
        )),
        (true, false) => Ok("?active=true"),
        (false, true) => Ok("?active=false"),
        (false, false) => Ok(""),
    }
}

/// A named ticket filter shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedFilter {
    /// New tickets and tickets assigned to the caller.
    NewAndMyOpen,
    /// Tickets the caller watches.
    Watching,
    /// Tickets marked as spam.
    Spam,
    /// Deleted tickets.
    Deleted,
}

impl PredefinedFilter {
    /// The value sent to the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            PredefinedFilter::NewAndMyOpen => "new_and_my_open",
            PredefinedFilter::Watching => "watching",
            PredefinedFilter::Spam => "spam",
            PredefinedFilter::Deleted => "deleted",
        }
    }
}

impl FromStr for PredefinedFilter {
    type Err = FreshError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new_and_my_open" => Ok(PredefinedFilter::NewAndMyOpen),
            "watching" => Ok(PredefinedFilter::Watching),
            "spam" => Ok(PredefinedFilter::Spam),
            "deleted" => Ok(PredefinedFilter::Deleted),
            _ => Err(FreshError::InvalidPredefinedFilter {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for PredefinedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PredefinedFilter> for String {
    fn from(filter: PredefinedFilter) -> Self {
        filter.as_str().to_string()
    }
}

/// Boolean operator joining `field:value` filter terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterLogic {
    /// All terms must match.
    #[default]
    And,
    /// Any term may match.
    Or,
}

impl FilterLogic {
    /// The upper-case operator used in filter expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterLogic::And => "AND",
            FilterLogic::Or => "OR",
        }
    }
}

impl FromStr for FilterLogic {
    type Err = FreshError;

    /// Parses `and`/`or` in any case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "AND" => Ok(FilterLogic::And),
            "OR" => Ok(FilterLogic::Or),
            _ => Err(FreshError::InvalidFilterLogic {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for FilterLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered `field -> value` pairs with unique fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilters {
    pairs: Vec<(String, String)>,
}

impl FieldFilters {
    /// Creates an empty set of field filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`.
    ///
    /// Re-inserting an existing field replaces its value and keeps its position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl fmt::Display) {
        let field = field.into();
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(name, _)| *name == field) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((field, value)),
        }
    }

    /// Builder form of [`FieldFilters::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(field, value);
        self
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no pairs are set.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }

    /// The unencoded filter expression, e.g. `priority:3 AND status:2`.
    pub fn expression(&self, logic: FilterLogic) -> String {
        let separator = format!(" {} ", logic);
        self.iter()
            .map(|(field, value)| format!("{}:{}", field, value))
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

impl<K, V> FromIterator<(K, V)> for FieldFilters
where
    K: Into<String>,
    V: fmt::Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = FieldFilters::new();
        for (field, value) in iter {
            filters.insert(field, value);
        }
        filters
    }
}

/// Filter input for the ticket filter endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filters {
    /// A ready-made query expression, encoded as a whole.
    Query(String),
    /// Field/value pairs joined with the filter logic.
    Fields(FieldFilters),
}

impl Filters {
    /// True when there is nothing to filter on.
    pub fn is_empty(&self) -> bool {
        match self {
            Filters::Query(query) => query.is_empty(),
            Filters::Fields(fields) => fields.is_empty(),
        }
    }

    /// The unencoded filter expression.
    pub fn expression(&self, logic: FilterLogic) -> String {
        match self {
            Filters::Query(query) => query.clone(),
            Filters::Fields(fields) => fields.expression(logic),
        }
    }
}

impl From<&str> for Filters {
    fn from(query: &str) -> Self {
        Filters::Query(query.to_string())
    }
}

impl From<String> for Filters {
    fn from(query: String) -> Self {
        Filters::Query(query)
    }
}

impl From<FieldFilters> for Filters {
    fn from(fields: FieldFilters) -> Self {
        Filters::Fields(fields)
    }
}

/// Compiles filters into a `/filter?query="..."` path suffix.
///
/// # Errors
///
/// Returns `FreshError::InvalidFilterLogic` unless `logic` is AND or OR (any case).
pub fn compile_filters(filters: &Filters, logic: &str) -> Result<String, FreshError> {
    let logic: FilterLogic = logic.parse()?;

    if let Filters::Fields(fields) = filters {
        for (field, _) in fields.iter() {
            if !SUPPORTED_FILTER_FIELDS.contains(&field) {
                tracing::debug!(field = %field, "Filtering on a field outside the documented set");
            }
        }
    }

    let expression = filters.expression(logic);
    Ok(format!("/filter?query=\"{}\"", url_encode(&expression)))
}

/// Returns the value if it is present and non-empty.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Sorting, pagination and narrowing options for ticket requests.
///
/// Use the builder methods; unset, empty and zero values emit nothing.
#[derive(Debug, Clone, Default)]
pub struct TicketConstraints {
    include: Vec<String>,
    predefined_filter: Option<String>,
    requester_id: Option<String>,
    requester_email: Option<String>,
    ticket_type: Option<String>,
    updated_since: Option<String>,
    ascending: bool,
    descending: bool,
    per_page: Option<u32>,
    page: Option<u32>,
}

impl TicketConstraints {
    /// Creates empty constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Embeds related records (e.g. `stats`, `requester`) in the response.
    pub fn with_include<I, S>(mut self, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = include.into_iter().map(Into::into).collect();
        self
    }

    /// Applies a predefined filter; validated when compiled.
    pub fn with_predefined_filter(mut self, filter: impl Into<String>) -> Self {
        self.predefined_filter = Some(filter.into());
        self
    }

    /// Restricts to a requester ID.
    pub fn with_requester_id(mut self, requester_id: impl fmt::Display) -> Self {
        self.requester_id = Some(requester_id.to_string());
        self
    }

    /// Restricts to a requester email address.
    pub fn with_requester_email(mut self, email: impl Into<String>) -> Self {
        self.requester_email = Some(email.into());
        self
    }

    /// Restricts to a ticket type (e.g. `Service Request`).
    pub fn with_ticket_type(mut self, ticket_type: impl Into<String>) -> Self {
        self.ticket_type = Some(ticket_type.into());
        self
    }

    /// Only tickets updated since this UTC timestamp.
    pub fn with_updated_since(mut self, timestamp: impl Into<String>) -> Self {
        self.updated_since = Some(timestamp.into());
        self
    }

    /// Sorts ascending.
    pub fn ascending(mut self) -> Self {
        self.ascending = true;
        self
    }

    /// Sorts descending.
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Results per page.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Page number to return.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Compiles the constraints into a query string (empty if nothing is set).
    ///
    /// Terms are emitted in a fixed order: include, filter, requester_id,
    /// requester_email, type, updated_since, order_type (asc then desc),
    /// per_page, page. Setting both sort directions emits both terms.
    ///
    /// # Errors
    ///
    /// Returns `FreshError::InvalidPredefinedFilter` for an unknown predefined filter.
    pub fn to_query_string(&self) -> Result<String, FreshError> {
        let mut query = String::new();

        if !self.include.is_empty() {
            // TODO: check include values against the embeds the endpoint supports
            query = construct_query_string(&query, &format!("include={}", self.include.join(",")));
        }
        if let Some(filter) = present(&self.predefined_filter) {
            let filter: PredefinedFilter = filter.parse()?;
            query = construct_query_string(&query, &format!("filter={}", filter));
        }
        if let Some(requester_id) = present(&self.requester_id) {
            query = construct_query_string(&query, &format!("requester_id={}", requester_id));
        }
        if let Some(email) = present(&self.requester_email) {
            query = construct_query_string(&query, &format!("requester_email={}", url_encode(email)));
        }
        if let Some(ticket_type) = present(&self.ticket_type) {
            query = construct_query_string(&query, &format!("type={}", ticket_type.replace(' ', "+")));
        }
        if let Some(updated_since) = present(&self.updated_since) {
            query = construct_query_string(&query, &format!("updated_since={}", updated_since));
        }
        if self.ascending {
            query = construct_query_string(&query, "order_type=asc");
        }
        if self.descending {
            query = construct_query_string(&query, "order_type=desc");
        }
        if let Some(per_page) = self.per_page.filter(|&n| n > 0) {
            query = construct_query_string(&query, &format!("per_page={}", per_page));
        }
        if let Some(page) = self.page.filter(|&n| n > 0) {
            query = construct_query_string(&query, &format!("page={}", page));
        }

        Ok(query)
    }
}

/// Parameters for listing tickets.
///
/// Filters and constraints are never combined: when non-empty filters are
/// set, the constraints are ignored.
#[derive(Debug, Clone, Default)]
pub struct TicketListParams {
    constraints: TicketConstraints,
    filters: Option<Filters>,
    filter_logic: Option<String>,
}

impl TicketListParams {
    /// Creates parameters that list tickets with server defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given constraints.
    pub fn with_constraints(mut self, constraints: TicketConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Queries the filter endpoint instead.
    pub fn with_filters(mut self, filters: impl Into<Filters>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    /// Operator joining field filters (`AND` when unset).
    pub fn with_filter_logic(mut self, logic: impl Into<String>) -> Self {
        self.filter_logic = Some(logic.into());
        self
    }

    /// The constraints in use.
    pub fn constraints(&self) -> &TicketConstraints {
        &self.constraints
    }

    /// Returns the suffix to append to the `tickets` path.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown predefined filter or filter logic.
    pub fn to_path_suffix(&self) -> Result<String, FreshError> {
        match self.filters.as_ref().filter(|f| !f.is_empty()) {
            Some(filters) => {
                let logic = self
                    .filter_logic
                    .as_deref()
                    .unwrap_or(FilterLogic::default().as_str());
                compile_filters(filters, logic)
            }
            None => self.constraints.to_query_string(),
        }
    }
}

impl From<TicketConstraints> for TicketListParams {
    fn from(constraints: TicketConstraints) -> Self {
        Self::new().with_constraints(constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_construct_query_string_first_term() {
        assert_eq!(construct_query_string("", "a=1"), "?a=1");
    }

    #[test]
    fn test_construct_query_string_joins_with_ampersand() {
        assert_eq!(construct_query_string("?a=1", "b=2"), "?a=1&b=2");
        assert_eq!(construct_query_string("?a=1&b=2", "c=3"), "?a=1&b=2&c=3");
    }

    #[test]
    fn test_construct_query_string_never_double_prefixes() {
        assert_eq!(construct_query_string("?", "a=1"), "?a=1");
        assert_eq!(construct_query_string("", "?a=1"), "?a=1");
        assert_eq!(construct_query_string("?a=1", ""), "?a=1");
        assert_eq!(construct_query_string("", ""), "");
    }

    #[test]
    fn test_url_encode_uses_plus_for_spaces() {
        assert_eq!(url_encode("a@b.com"), "a%40b.com");
        assert_eq!(url_encode("priority:high OR status:open"), "priority%3Ahigh+OR+status%3Aopen");
        assert_eq!(url_encode("50%20off"), "50%2520off");
        assert_eq!(url_encode("a-b_c.d~e"), "a-b_c.d~e");
    }

    #[test]
    fn test_email_lookup_query() {
        assert_eq!(email_lookup_query("user@example.com"), "?email=user%40example.com");
    }

    #[test]
    fn test_active_agents_query() {
        assert_eq!(active_agents_query(true, false).unwrap(), "?active=true");
        assert_eq!(active_agents_query(false, true).unwrap(), "?active=false");
        assert_eq!(active_agents_query(false, false).unwrap(), "");
        assert!(matches!(
            active_agents_query(true, true),
            Err(FreshError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_each_constraint_format() {
        let cases = [
            (TicketConstraints::new().with_include(["a", "b", "c"]), "?include=a,b,c"),
            (TicketConstraints::new().with_include(["stats"]), "?include=stats"),
            (
                TicketConstraints::new().with_predefined_filter(PredefinedFilter::NewAndMyOpen),
                "?filter=new_and_my_open",
            ),
            (TicketConstraints::new().with_requester_id(123), "?requester_id=123"),
            (
                TicketConstraints::new().with_requester_email("a@b.com"),
                "?requester_email=a%40b.com",
            ),
            (
                TicketConstraints::new().with_ticket_type("Service Request"),
                "?type=Service+Request",
            ),
            (
                TicketConstraints::new().with_updated_since("2021-01-01T00:00:00Z"),
                "?updated_since=2021-01-01T00:00:00Z",
            ),
            (TicketConstraints::new().ascending(), "?order_type=asc"),
            (TicketConstraints::new().descending(), "?order_type=desc"),
            (
                TicketConstraints::new().with_per_page(30).with_page(2),
                "?per_page=30&page=2",
            ),
        ];

        for (constraints, expected) in cases {
            assert_eq!(constraints.to_query_string().unwrap(), expected);
        }
    }

    #[test]
    fn test_constraint_order_is_fixed() {
        // Builder order is deliberately scrambled.
        let constraints = TicketConstraints::new()
            .with_page(2)
            .with_per_page(30)
            .descending()
            .with_updated_since("2021-01-01")
            .with_ticket_type("Incident")
            .with_requester_email("a b@c.com")
            .with_requester_id("42")
            .with_predefined_filter("watching")
            .with_include(["requester", "stats"]);

        assert_eq!(
            constraints.to_query_string().unwrap(),
            "?include=requester,stats&filter=watching&requester_id=42\
             &requester_email=a+b%40c.com&type=Incident&updated_since=2021-01-01\
             &order_type=desc&per_page=30&page=2"
        );
    }

    #[test]
    fn test_empty_constraints_produce_nothing() {
        assert_eq!(TicketConstraints::new().to_query_string().unwrap(), "");

        let blank = TicketConstraints::new()
            .with_requester_email("")
            .with_ticket_type("")
            .with_per_page(0)
            .with_page(0)
            .with_include(Vec::<String>::new());
        assert_eq!(blank.to_query_string().unwrap(), "");
    }

    #[test]
    fn test_both_sort_directions_are_emitted() {
        let constraints = TicketConstraints::new().ascending().descending();
        assert_eq!(
            constraints.to_query_string().unwrap(),
            "?order_type=asc&order_type=desc"
        );
    }

    #[test]
    fn test_invalid_predefined_filter() {
        let err = TicketConstraints::new()
            .with_include(["stats"])
            .with_predefined_filter("mine")
            .to_query_string()
            .unwrap_err();
        assert!(matches!(err, FreshError::InvalidPredefinedFilter { ref value } if value == "mine"));
    }

    #[test]
    fn test_predefined_filter_roundtrip_names() {
        for name in VALID_PREDEFINED_FILTERS {
            let filter: PredefinedFilter = name.parse().unwrap();
            assert_eq!(filter.as_str(), name);
        }
        assert!("Watching".parse::<PredefinedFilter>().is_err());
    }

    #[test]
    fn test_filter_logic_parsing() {
        assert_eq!("and".parse::<FilterLogic>().unwrap(), FilterLogic::And);
        assert_eq!("Or".parse::<FilterLogic>().unwrap(), FilterLogic::Or);
        let err = "XOR".parse::<FilterLogic>().unwrap_err();
        assert!(matches!(err, FreshError::InvalidFilterLogic { ref value } if value == "XOR"));
    }

    #[test]
    fn test_field_filters_keep_insertion_order_and_unique_keys() {
        let mut fields = FieldFilters::new().with("status", 2).with("priority", 3);
        fields.insert("status", 4);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.expression(FilterLogic::And), "status:4 AND priority:3");
    }

    #[test]
    fn test_expression_has_n_minus_one_operators() {
        let fields: FieldFilters = [("agent_id", "1"), ("group_id", "2"), ("priority", "3"), ("status", "2")]
            .into_iter()
            .collect();
        let expression = fields.expression("or".parse().unwrap());
        assert_eq!(expression.matches(" OR ").count(), fields.len() - 1);
        assert!(!expression.contains(" or "));
    }

    #[test]
    fn test_compile_filters_mapping() {
        let fields = FieldFilters::new().with("field1", "value1").with("field2", "value2");
        assert_eq!(
            compile_filters(&fields.into(), "and").unwrap(),
            "/filter?query=\"field1%3Avalue1+AND+field2%3Avalue2\""
        );
    }

    #[test]
    fn test_compile_filters_raw_query() {
        let filters = Filters::from("priority:3 AND status:2");
        assert_eq!(
            compile_filters(&filters, "AND").unwrap(),
            "/filter?query=\"priority%3A3+AND+status%3A2\""
        );
    }

    #[test]
    fn test_compile_filters_rejects_bad_logic_for_raw_query() {
        let err = compile_filters(&Filters::from("status:2"), "NOT").unwrap_err();
        assert!(matches!(err, FreshError::InvalidFilterLogic { .. }));
    }

    #[test]
    fn test_list_params_filters_take_precedence() {
        let params = TicketListParams::new()
            .with_constraints(TicketConstraints::new().with_per_page(10))
            .with_filters(FieldFilters::new().with("priority", "high").with("status", "open"))
            .with_filter_logic("OR");
        assert_eq!(
            format!("tickets{}", params.to_path_suffix().unwrap()),
            "tickets/filter?query=\"priority%3Ahigh+OR+status%3Aopen\""
        );
    }

    #[test]
    fn test_list_params_empty_filters_fall_back_to_constraints() {
        let params = TicketListParams::from(TicketConstraints::new().with_per_page(10))
            .with_filters(FieldFilters::new())
            .with_filter_logic("bogus");
        assert_eq!(params.to_path_suffix().unwrap(), "?per_page=10");
    }

    #[test]
    fn test_list_params_default_logic_is_and() {
        let params = TicketListParams::new().with_filters(FieldFilters::new().with("a", 1).with("b", 2));
        assert_eq!(
            params.to_path_suffix().unwrap(),
            "/filter?query=\"a%3A1+AND+b%3A2\""
        );
    }
}
