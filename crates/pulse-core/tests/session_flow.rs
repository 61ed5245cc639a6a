use std::sync::{Arc, Mutex};

use pulse_core::actions::{EventActions, RefetchTarget, Refetcher};
use pulse_core::models::{Credentials, EventFilters, EventStatus, EventType};
use pulse_core::resources::{self, EventsFeed, EventsQuery};
use pulse_core::toast::{self, ToastLevel};
use pulse_core::token_store::{FileTokenStore, TokenStore};
use pulse_core::{Gateway, SessionStore, ToastSink};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn user_json() -> serde_json::Value {
    json!({"id": 1, "username": "alice", "email": "a@b.com", "is_admin": true})
}

fn event_json(id: i64, participating: bool, archived: bool) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Турнир",
        "description": "Волейбол",
        "start_datetime": "2025-05-14T09:00:00",
        "location": "Восточный кампус",
        "event_type": "Спортивное",
        "roles_available": ["Участник"],
        "created_at": "2025-05-01T10:00:00",
        "updated_at": "2025-05-01T10:00:00",
        "author_id": 1,
        "is_archived": archived,
        "is_participating": participating
    })
}

struct Harness {
    store: SessionStore,
    toasts: toast::ToastReceiver,
    tokens: Arc<FileTokenStore>,
    _dir: tempfile::TempDir,
}

fn harness(server: &MockServer) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let tokens = Arc::new(FileTokenStore::open(dir.path().join("token")).unwrap());
    let (sink, rx) = ToastSink::channel();
    let store = SessionStore::new(
        Gateway::http_client(None).unwrap(),
        &server.uri(),
        Arc::clone(&tokens) as Arc<dyn TokenStore>,
        sink,
    );
    Harness {
        store,
        toasts: rx,
        tokens,
        _dir: dir,
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "T", "user": user_json()})),
        )
        .mount(server)
        .await;
}

fn credentials() -> Credentials {
    Credentials {
        email: "a@b.com".into(),
        password: "secret".into(),
    }
}

#[tokio::test]
async fn test_login_stores_token_and_welcomes_user() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let mut h = harness(&server);

    let user = h.store.login(&credentials()).await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(h.tokens.load().as_deref(), Some("T"));
    assert!(h.store.is_authenticated());

    let toasts = toast::drain(&mut h.toasts);
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].level, ToastLevel::Success);
    assert!(toasts[0].message.contains("alice"));

    h.store.logout();
    assert!(h.tokens.load().is_none());
    assert!(!h.tokens.path().exists());
    assert!(!h.store.is_authenticated());
}

#[tokio::test]
async fn test_login_failure_leaves_state_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Неверный email или пароль"})),
        )
        .mount(&server)
        .await;
    let mut h = harness(&server);

    let err = h.store.login(&credentials()).await.unwrap_err();
    assert_eq!(err.user_message("Login failed"), "Неверный email или пароль");
    assert!(h.tokens.load().is_none());
    assert!(!h.store.is_authenticated());
    assert!(toast::drain(&mut h.toasts).is_empty());
}

#[tokio::test]
async fn test_racing_401s_sign_out_once() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "expired"})))
        .mount(&server)
        .await;
    let mut h = harness(&server);
    h.store.login(&credentials()).await.unwrap();
    toast::drain(&mut h.toasts);

    let gateway = h.store.gateway();
    let events_query = EventsQuery::default();
    let (a, b, c) = tokio::join!(
        resources::fetch_events(&gateway, &events_query),
        resources::fetch_notifications(&gateway),
        resources::fetch_participation_counts(&gateway),
    );
    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert!(c.unwrap_err().is_unauthorized());

    assert!(h.tokens.load().is_none());
    assert!(!h.store.is_authenticated());
    let toasts = toast::drain(&mut h.toasts);
    assert_eq!(toasts.len(), 1, "{toasts:?}");
    assert_eq!(toasts[0].message, "You have been signed out.");
}

#[tokio::test]
async fn test_events_query_carries_type_and_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("type", "Спортивное"))
        .and(query_param("search", "турнир"))
        .and(query_param("status", "active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([event_json(1, false, false)])))
        .expect(1)
        .mount(&server)
        .await;
    let h = harness(&server);

    let query = EventsQuery {
        filters: EventFilters {
            event_type: Some(EventType::Sports),
            ..EventFilters::default()
        },
        search: "турнир".into(),
        status: Some(EventStatus::Active),
    };
    let events = resources::fetch_events(&h.store.gateway(), &query).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Sports);
}

/// Serves the active or archived list depending on whether the event has
/// been archived.
struct ArchiveState {
    archived: Arc<Mutex<bool>>,
    want_archive: bool,
}

impl Respond for ArchiveState {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let archived = *self.archived.lock().unwrap();
        let body = if archived == self.want_archive {
            json!([event_json(7, false, archived)])
        } else {
            json!([])
        };
        ResponseTemplate::new(200).set_body_json(body)
    }
}

struct Toggle {
    archived: Arc<Mutex<bool>>,
    value: bool,
}

impl Respond for Toggle {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        *self.archived.lock().unwrap() = self.value;
        ResponseTemplate::new(200).set_body_json(json!({"message": "ok"}))
    }
}

fn recording_refetcher() -> (Arc<dyn Refetcher>, Arc<Mutex<Vec<RefetchTarget>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let refetcher: Arc<dyn Refetcher> = Arc::new(move |target: RefetchTarget| {
        sink.lock().unwrap().push(target);
    });
    (refetcher, seen)
}

#[tokio::test]
async fn test_archive_moves_event_between_lists_and_restore_reverses() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let archived = Arc::new(Mutex::new(false));
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("status", "active"))
        .respond_with(ArchiveState {
            archived: Arc::clone(&archived),
            want_archive: false,
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("status", "archive"))
        .respond_with(ArchiveState {
            archived: Arc::clone(&archived),
            want_archive: true,
        })
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/events/7/archive"))
        .respond_with(Toggle {
            archived: Arc::clone(&archived),
            value: true,
        })
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/events/7/restore"))
        .respond_with(Toggle {
            archived: Arc::clone(&archived),
            value: false,
        })
        .mount(&server)
        .await;

    let h = harness(&server);
    h.store.login(&credentials()).await.unwrap();
    let gateway = h.store.gateway();
    let (refetcher, seen) = recording_refetcher();
    let actions = EventActions::new(gateway.clone(), h.store.toasts().clone(), refetcher);

    let mut active = EventsFeed::new(EventStatus::Active);
    let mut archive = EventsFeed::new(EventStatus::Archive);

    async fn reload(feed: &mut EventsFeed, gateway: &Gateway) {
        let ticket = feed.refetch();
        let result = resources::fetch_events(gateway, feed.query()).await;
        assert!(feed.complete(ticket, result));
    }

    reload(&mut active, &gateway).await;
    reload(&mut archive, &gateway).await;
    assert!(active.find(7).is_some());
    assert!(archive.find(7).is_none());

    actions.archive(7).await.unwrap();
    assert_eq!(seen.lock().unwrap().last(), Some(&RefetchTarget::Events));
    reload(&mut active, &gateway).await;
    reload(&mut archive, &gateway).await;
    assert!(active.find(7).is_none());
    assert!(archive.find(7).is_some_and(|e| e.is_archived));

    actions.restore(7).await.unwrap();
    reload(&mut active, &gateway).await;
    reload(&mut archive, &gateway).await;
    assert!(active.find(7).is_some());
    assert!(archive.find(7).is_none());
}

struct Participation {
    participating: Arc<Mutex<bool>>,
}

impl Respond for Participation {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut participating = self.participating.lock().unwrap();
        *participating = request.method.as_str() == "POST";
        ResponseTemplate::new(200).set_body_json(json!({"message": "ok"}))
    }
}

struct EventById {
    participating: Arc<Mutex<bool>>,
}

impl Respond for EventById {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let participating = *self.participating.lock().unwrap();
        ResponseTemplate::new(200).set_body_json(json!([event_json(3, participating, false)]))
    }
}

#[tokio::test]
async fn test_toggle_participation_twice_restores_state() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let participating = Arc::new(Mutex::new(false));
    Mock::given(path("/api/events/3/participate"))
        .respond_with(Participation {
            participating: Arc::clone(&participating),
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(EventById {
            participating: Arc::clone(&participating),
        })
        .mount(&server)
        .await;

    let h = harness(&server);
    h.store.login(&credentials()).await.unwrap();
    let gateway = h.store.gateway();
    let (refetcher, _seen) = recording_refetcher();
    let actions = EventActions::new(gateway.clone(), h.store.toasts().clone(), refetcher);
    let query = EventsQuery::with_status(EventStatus::Active);

    let original = resources::fetch_events(&gateway, &query).await.unwrap().remove(0);
    assert!(!original.is_participating());

    assert!(actions.toggle_participation(&original).await.unwrap());
    let after_first = resources::fetch_events(&gateway, &query).await.unwrap().remove(0);
    assert!(after_first.is_participating());

    assert!(!actions.toggle_participation(&after_first).await.unwrap());
    let after_second = resources::fetch_events(&gateway, &query).await.unwrap().remove(0);
    assert_eq!(after_second.is_participating(), original.is_participating());
}
