//! Fetch-on-input-change resource state.
//!
//! A [`Resource`] is the `{data, is_loading, error}` surface the view reads.
//! Fetches are started with [`Resource::begin`], which hands out a
//! [`FetchTicket`]; the response is applied with [`Resource::complete`] only
//! if no newer fetch has started since. Stale responses are dropped.

use std::time::Duration;

use url::form_urlencoded;

use crate::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateway;
use crate::models::{
    Event, EventFilters, EventStatus, Notification, Participation, ParticipationCounts,
    ParticipationStatus,
};

/// Proof that a fetch was started. Only the latest ticket is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
pub struct Resource<T> {
    pub data: T,
    pub is_loading: bool,
    pub error: Option<String>,
    generation: u64,
    fallback: &'static str,
}

impl<T: Default> Resource<T> {
    /// `fallback` is the message stored when the server gives none.
    pub fn new(fallback: &'static str) -> Self {
        Self {
            data: T::default(),
            is_loading: false,
            error: None,
            generation: 0,
            fallback,
        }
    }

    /// Starts a fetch, superseding any fetch in flight.
    pub fn begin(&mut self) -> FetchTicket {
        self.generation += 1;
        self.is_loading = true;
        self.error = None;
        FetchTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Applies a fetch result. Returns false if the ticket is stale.
    ///
    /// The 401 sentinel stores no error: the forced logout already told the
    /// user, and [`clear`](Self::clear) follows.
    pub fn complete(&mut self, ticket: FetchTicket, result: ClientResult<T>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale response"
            );
            return false;
        }
        self.is_loading = false;
        match result {
            Ok(data) => {
                self.data = data;
                self.error = None;
            }
            Err(ClientError::Unauthorized) => {}
            Err(e) => self.error = Some(e.user_message(self.fallback)),
        }
        true
    }

    /// Empties the resource without a network call and invalidates any
    /// fetch in flight.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.data = T::default();
        self.is_loading = false;
        self.error = None;
    }
}

// ============================================================================
// Events
// ============================================================================

/// Inputs of the events list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsQuery {
    pub filters: EventFilters,
    pub search: String,
    pub status: Option<EventStatus>,
}

impl EventsQuery {
    pub fn with_status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Encoded query: set filters, then `search`, then `status`.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.filters.query_pairs() {
            serializer.append_pair(key, &value);
        }
        let search = self.search.trim();
        if !search.is_empty() {
            serializer.append_pair("search", search);
        }
        if let Some(status) = self.status {
            serializer.append_pair("status", status.as_str());
        }
        serializer.finish()
    }

    pub fn path(&self) -> String {
        endpoints::with_query(endpoints::EVENTS, &self.to_query_string())
    }
}

/// Events list keyed by its query.
#[derive(Debug, Clone)]
pub struct EventsFeed {
    query: EventsQuery,
    pub resource: Resource<Vec<Event>>,
}

impl EventsFeed {
    pub fn new(status: EventStatus) -> Self {
        Self {
            query: EventsQuery::with_status(status),
            resource: Resource::new("Failed to load events"),
        }
    }

    pub fn query(&self) -> &EventsQuery {
        &self.query
    }

    pub fn events(&self) -> &[Event] {
        &self.resource.data
    }

    /// Replaces the query; returns a ticket only when it actually changed.
    pub fn set_query(&mut self, query: EventsQuery) -> Option<FetchTicket> {
        if query == self.query {
            return None;
        }
        self.query = query;
        Some(self.resource.begin())
    }

    pub fn set_filters(&mut self, filters: EventFilters) -> Option<FetchTicket> {
        let query = EventsQuery {
            filters,
            ..self.query.clone()
        };
        self.set_query(query)
    }

    pub fn reset_filters(&mut self) -> Option<FetchTicket> {
        self.set_filters(EventFilters::default())
    }

    pub fn set_search(&mut self, search: &str) -> Option<FetchTicket> {
        let query = EventsQuery {
            search: search.trim().to_string(),
            ..self.query.clone()
        };
        self.set_query(query)
    }

    pub fn refetch(&mut self) -> FetchTicket {
        self.resource.begin()
    }

    pub fn complete(&mut self, ticket: FetchTicket, result: ClientResult<Vec<Event>>) -> bool {
        self.resource.complete(ticket, result)
    }

    pub fn find(&self, id: i64) -> Option<&Event> {
        self.resource.data.iter().find(|e| e.id == id)
    }
}

// ============================================================================
// Fetchers
// ============================================================================

/// # Errors
/// Gateway, API and decode errors.
pub async fn fetch_events(gateway: &Gateway, query: &EventsQuery) -> ClientResult<Vec<Event>> {
    gateway
        .get_json(&query.path(), "Failed to load events")
        .await
}

/// # Errors
/// Gateway, API and decode errors.
pub async fn fetch_participations(
    gateway: &Gateway,
    status: ParticipationStatus,
) -> ClientResult<Vec<Participation>> {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("status", status.as_str())
        .finish();
    gateway
        .get_json(
            &endpoints::with_query(endpoints::ME_PARTICIPATIONS, &query),
            "Failed to load your participations",
        )
        .await
}

/// # Errors
/// Gateway, API and decode errors.
pub async fn fetch_participation_counts(gateway: &Gateway) -> ClientResult<ParticipationCounts> {
    gateway
        .get_json(
            endpoints::ME_PARTICIPATIONS_COUNT,
            "Failed to load participation counts",
        )
        .await
}

/// # Errors
/// Gateway, API and decode errors.
pub async fn fetch_notifications(gateway: &Gateway) -> ClientResult<Vec<Notification>> {
    gateway
        .get_json(endpoints::NOTIFICATIONS, "Failed to load notifications")
        .await
}

// ============================================================================
// Debounce
// ============================================================================

/// Holds the latest input until it has been quiet for `delay`.
///
/// The caller sleeps for [`delay`](Self::delay) after each [`push`](Self::push)
/// and then calls [`settle`](Self::settle) with the returned generation; only
/// the most recent push yields its value.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    generation: u64,
    pending: Option<T>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T) -> u64 {
        self.generation += 1;
        self.pending = Some(value);
        self.generation
    }

    pub fn settle(&mut self, generation: u64) -> Option<T> {
        if generation == self.generation {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, ParticipantRole};

    #[test]
    fn test_default_query_is_empty() {
        assert_eq!(EventsQuery::default().to_query_string(), "");
        assert_eq!(EventsQuery::default().path(), "/api/events");
    }

    #[test]
    fn test_query_order_filters_search_status() {
        let query = EventsQuery {
            filters: EventFilters {
                role: Some(ParticipantRole::Volunteer),
                event_type: Some(EventType::Sports),
                ..EventFilters::default()
            },
            search: " турнир ".into(),
            status: Some(EventStatus::Archive),
        };
        let encoded = query.to_query_string();
        let pairs: Vec<(String, String)> = form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["role", "type", "search", "status"]);
        assert_eq!(pairs[1].1, "Спортивное");
        assert_eq!(pairs[2].1, "турнир");
        assert_eq!(pairs[3].1, "archive");
    }

    #[test]
    fn test_filters_then_reset_returns_to_unfiltered() {
        let mut feed = EventsFeed::new(EventStatus::Active);
        let unfiltered = feed.query().clone();
        assert!(
            feed.set_filters(EventFilters {
                event_type: Some(EventType::Cultural),
                ..EventFilters::default()
            })
            .is_some()
        );
        assert!(feed.reset_filters().is_some());
        assert_eq!(feed.query(), &unfiltered);
        assert_eq!(feed.query().to_query_string(), "status=active");
        assert!(feed.reset_filters().is_none());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut resource: Resource<Vec<u32>> = Resource::new("failed");
        let first = resource.begin();
        let second = resource.begin();
        assert!(resource.complete(second, Ok(vec![2])));
        assert!(!resource.complete(first, Ok(vec![1])));
        assert_eq!(resource.data, vec![2]);
        assert!(!resource.is_loading);
    }

    #[test]
    fn test_error_then_success_clears_error() {
        let mut resource: Resource<Vec<u32>> = Resource::new("Failed to load");
        let ticket = resource.begin();
        resource.complete(
            ticket,
            Err(ClientError::Api {
                status: 500,
                message: String::new(),
            }),
        );
        assert_eq!(resource.error.as_deref(), Some("Failed to load"));

        let ticket = resource.begin();
        resource.complete(ticket, Ok(vec![1]));
        assert!(resource.error.is_none());
    }

    #[test]
    fn test_unauthorized_stores_no_error() {
        let mut resource: Resource<Vec<u32>> = Resource::new("failed");
        let ticket = resource.begin();
        assert!(resource.complete(ticket, Err(ClientError::Unauthorized)));
        assert!(resource.error.is_none());
    }

    #[test]
    fn test_clear_invalidates_inflight() {
        let mut resource: Resource<Vec<u32>> = Resource::new("failed");
        let ticket = resource.begin();
        resource.clear();
        assert!(!resource.complete(ticket, Ok(vec![1])));
        assert!(resource.data.is_empty());
    }

    #[test]
    fn test_debouncer_keeps_latest() {
        let mut debouncer = Debouncer::new(Duration::from_millis(400));
        let a = debouncer.push("tu");
        let b = debouncer.push("турнир");
        assert_eq!(debouncer.settle(a), None);
        assert_eq!(debouncer.settle(b), Some("турнир"));
        assert_eq!(debouncer.settle(b), None);
    }
}
