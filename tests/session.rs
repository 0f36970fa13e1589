//! Session protocol tests against a mocked mailbox service.
//!
//! Time is simulated with [`ManualClock`]: sleeping advances the clock
//! instantly, so wait loops run without real delays.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempmail_sync::matcher::RegexMatcher;
use tempmail_sync::{
    Clock, Error, MailboxConfig, MailboxConfigBuilder, MailboxSession, SessionState, TokenSource,
    WaitOptions,
};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ─────────────────────────────────────────────────────────────────────────────
// Test Doubles
// ─────────────────────────────────────────────────────────────────────────────

const T0_MILLIS: i64 = 1_700_000_000_000;
const TOKEN: &str = "test-token";
const PRESET: &str = "fixed@qabq.com";

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(DateTime::from_timestamp_millis(T0_MILLIS).unwrap()),
        })
    }

    fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

struct FakeTokens {
    succeed: bool,
    hints: Mutex<Vec<Option<String>>>,
}

impl FakeTokens {
    fn working() -> Arc<Self> {
        Arc::new(Self {
            succeed: true,
            hints: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            succeed: false,
            hints: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TokenSource for FakeTokens {
    async fn acquire(&self, hint: Option<&str>) -> tempmail_sync::Result<SecretString> {
        self.hints.lock().unwrap().push(hint.map(ToString::to_string));
        if self.succeed {
            Ok(SecretString::from(TOKEN.to_string()))
        } else {
            Err(Error::MissingAuthCookie {
                available: vec!["session".into()],
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> MailboxConfigBuilder {
    MailboxConfig::builder()
        .web_url(format!("{}/zh/", server.uri()))
        .api_base(format!("{}/api", server.uri()))
        .domains(["qabq.com"])
}

fn preset_config(server: &MockServer) -> MailboxConfig {
    config_for(server)
        .email(PRESET)
        .auto_create(false)
        .build()
        .unwrap()
}

fn record(id: &str, subject: &str, offset_millis: Option<i64>) -> Value {
    let mut record = json!({
        "id": id,
        "subject": subject,
        "from": {"address": "noreply@service.test"},
        "text": "",
        "html": "",
        "headers": {}
    });
    if let Some(offset) = offset_millis {
        record["posix-millis"] = json!(T0_MILLIS + offset);
    }
    record
}

fn with_text(mut record: Value, text: &str) -> Value {
    record["text"] = json!(text);
    record
}

async fn mount_inbox(server: &MockServer, records: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{PRESET}")))
        .and(header("authorization", format!("bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

async fn bound_session(server: &MockServer, clock: &Arc<ManualClock>) -> MailboxSession {
    let mut session =
        MailboxSession::with_parts(preset_config(server), FakeTokens::working(), clock.clone())
            .unwrap();
    assert!(session.connect().await);
    session
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_binds_generated_address() {
    let server = MockServer::start().await;
    let clock = ManualClock::new();
    let mut session = MailboxSession::with_parts(
        config_for(&server).build().unwrap(),
        FakeTokens::working(),
        clock.clone(),
    )
    .unwrap();

    assert_eq!(session.state(), SessionState::Unbound);
    assert!(session.connect().await);

    assert_eq!(session.state(), SessionState::Bound);
    let address = session.address().unwrap();
    assert!(address.ends_with("@qabq.com"));
    assert_eq!(session.created_at(), Some(clock.now()));
}

#[tokio::test]
async fn test_connect_failure_leaves_session_unbound() {
    let server = MockServer::start().await;
    let mut session = MailboxSession::with_parts(
        config_for(&server).build().unwrap(),
        FakeTokens::failing(),
        ManualClock::new(),
    )
    .unwrap();

    assert!(!session.connect().await);
    assert_eq!(session.state(), SessionState::Unbound);
    assert!(session.address().is_none());
    assert!(session.created_at().is_none());

    let err = session.try_connect().await.unwrap_err();
    assert!(matches!(err, Error::MissingAuthCookie { .. }));
}

#[tokio::test]
async fn test_connect_keeps_preset_address_and_hints_it() {
    let server = MockServer::start().await;
    let tokens = FakeTokens::working();
    let mut session =
        MailboxSession::with_parts(preset_config(&server), tokens.clone(), ManualClock::new())
            .unwrap();

    assert!(session.connect().await);
    assert_eq!(session.address(), Some(PRESET));
    assert!(session.created_at().is_none());

    session.refresh_token().await.unwrap();
    let hints = tokens.hints.lock().unwrap().clone();
    assert_eq!(hints, vec![Some(PRESET.to_string()), Some(PRESET.to_string())]);
}

#[tokio::test]
async fn test_auto_create_replaces_preset_address() {
    let server = MockServer::start().await;
    let config = config_for(&server).email(PRESET).build().unwrap();
    let mut session =
        MailboxSession::with_parts(config, FakeTokens::working(), ManualClock::new()).unwrap();

    assert!(session.connect_with(true).await);
    assert_ne!(session.address(), Some(PRESET));
}

#[tokio::test]
async fn test_create_address_moves_created_at_forward() {
    let server = MockServer::start().await;
    let clock = ManualClock::new();
    let mut session = bound_session(&server, &clock).await;

    let first = session.create_address();
    let first_at = session.created_at().unwrap();
    let second = session.create_address();
    let second_at = session.created_at().unwrap();

    assert!(second_at > first_at);
    assert!(first.ends_with("@qabq.com") && second.ends_with("@qabq.com"));
    assert!(session.is_connected());
}

#[tokio::test]
async fn test_cookie_handshake_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zh/"))
        .and(header("cookie", "mtd_address=fixed%40qabq.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "auth_token=%22abc.def%22; Path=/"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/{PRESET}")))
        .and(header("authorization", "bearer abc.def"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record("m1", "Hi", None)])))
        .mount(&server)
        .await;

    let mut session = MailboxSession::new(preset_config(&server)).unwrap();
    session.try_connect().await.unwrap();

    let messages = session.try_fetch_messages(10, None).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].recipient(), PRESET);
}

#[tokio::test]
async fn test_cookie_handshake_without_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zh/"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "session=1; Path=/"))
        .mount(&server)
        .await;

    let mut session = MailboxSession::new(config_for(&server).build().unwrap()).unwrap();

    assert!(!session.connect().await);
    match session.try_connect().await {
        Err(Error::MissingAuthCookie { available }) => assert_eq!(available, vec!["session"]),
        other => panic!("expected MissingAuthCookie, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch & Delete Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_filters_by_creation_time() {
    let server = MockServer::start().await;
    let clock = ManualClock::new();
    let mut session =
        MailboxSession::with_parts(preset_config(&server), FakeTokens::working(), clock.clone())
            .unwrap();
    assert!(session.connect().await);
    session.create_address();
    let address = session.address().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path(format!("/api/{address}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            record("old", "Old", Some(-60_000)),
            record("boundary", "Boundary", Some(0)),
            record("new", "New", Some(1_000)),
            record("undated", "Undated", None),
            {"subject": "no id"}
        ])))
        .mount(&server)
        .await;

    let messages = session.fetch_messages(20, None).await;
    let ids: Vec<_> = messages.iter().map(|m| m.id()).collect();
    assert_eq!(ids, vec!["new", "undated"]);

    let since = DateTime::from_timestamp_millis(T0_MILLIS - 120_000);
    let messages = session.fetch_messages(20, since).await;
    assert_eq!(messages.len(), 4);
}

#[tokio::test]
async fn test_fetch_respects_limit_and_tolerates_bad_timestamps() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;

    let mut bad = record("bad-ts", "Bad", None);
    bad["posix-millis"] = json!("soon");
    mount_inbox(
        &server,
        json!([bad, record("a", "A", None), record("b", "B", None)]),
    )
    .await;

    let messages = session.fetch_messages(2, None).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id(), "bad-ts");
    assert!(messages[0].received_at().is_none());
}

#[tokio::test]
async fn test_fetch_unbound_returns_empty() {
    let server = MockServer::start().await;
    let session = MailboxSession::with_parts(
        preset_config(&server),
        FakeTokens::working(),
        ManualClock::new(),
    )
    .unwrap();

    assert!(session.fetch_messages(10, None).await.is_empty());
    assert!(matches!(
        session.try_fetch_messages(10, None).await,
        Err(Error::NotConnected { .. })
    ));
    assert!(!session.delete_message("m1").await);
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_fetch_server_error_degrades() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    assert!(session.fetch_messages(10, None).await.is_empty());

    let err = session.try_fetch_messages(10, None).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedStatus { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_delete_message() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/api/{PRESET}/m1")))
        .and(header("authorization", format!("bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/api/[^/]+/m2$"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert!(session.delete_message("m1").await);
    // Only 200 counts as success.
    assert!(!session.delete_message("m2").await);
}

#[tokio::test]
async fn test_disconnect_is_idempotent_and_final() {
    let server = MockServer::start().await;
    let mut session = bound_session(&server, &ManualClock::new()).await;

    session.disconnect();
    session.disconnect();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.fetch_messages(10, None).await.is_empty());
    assert!(matches!(
        session.try_fetch_messages(10, None).await,
        Err(Error::Disconnected { .. })
    ));
    assert!(!session.connect().await);
}

#[tokio::test]
async fn test_guard_disconnects_on_drop() {
    let server = MockServer::start().await;
    let tokens = FakeTokens::working();
    let session =
        MailboxSession::with_parts(preset_config(&server), tokens.clone(), ManualClock::new())
            .unwrap();

    {
        let mut guard = session.into_guard();
        assert!(guard.connect().await);
        assert!(guard.is_connected());
    }

    // The session, and with it its handle on the token source, is gone.
    assert_eq!(Arc::strong_count(&tokens), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Wait Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_wait_skips_messages_older_than_the_wait() {
    let server = MockServer::start().await;
    let clock = ManualClock::new();
    let session = bound_session(&server, &clock).await;

    clock.advance(Duration::from_secs(60));
    mount_inbox(
        &server,
        json!([
            record("before-wait", "Welcome", Some(30_000)),
            record("after-wait", "Welcome", Some(61_000)),
        ]),
    )
    .await;

    let options = WaitOptions::new(Duration::from_secs(30), Duration::from_secs(5));
    let message = session.wait_for_message(&options).await.unwrap();
    assert_eq!(message.id(), "after-wait");
}

#[tokio::test]
async fn test_wait_applies_subject_and_sender_filters() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;

    mount_inbox(
        &server,
        json!([
            record("welcome", "Welcome aboard", None),
            record("verify", "Your VERIFICATION code", None),
        ]),
    )
    .await;

    let options = WaitOptions::new(Duration::from_secs(30), Duration::from_secs(5))
        .subject("verification")
        .sender("NOREPLY");
    let message = session.wait_for_message(&options).await.unwrap();
    assert_eq!(message.id(), "verify");
}

#[tokio::test]
async fn test_wait_times_out() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;
    mount_inbox(&server, json!([])).await;

    let options = WaitOptions::new(Duration::from_secs(30), Duration::from_secs(5));
    assert!(session.wait_for_message(&options).await.is_none());

    // One poll after each of the six intervals that fit in the timeout.
    assert_eq!(request_count(&server).await, 6);
}

#[tokio::test]
async fn test_wait_survives_failed_polls() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_inbox(&server, json!([record("m1", "Hello", None)])).await;

    let options = WaitOptions::new(Duration::from_secs(60), Duration::from_secs(5));
    let message = session.wait_for_message(&options).await.unwrap();

    assert_eq!(message.id(), "m1");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_wait_on_unbound_session_returns_immediately() {
    let server = MockServer::start().await;
    let session = MailboxSession::with_parts(
        preset_config(&server),
        FakeTokens::working(),
        ManualClock::new(),
    )
    .unwrap();

    let options = WaitOptions::new(Duration::from_secs(60), Duration::from_secs(5));
    assert!(session.wait_for_message(&options).await.is_none());
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_wait_on_disconnected_session_returns_after_one_poll() {
    let server = MockServer::start().await;
    let clock = ManualClock::new();
    let mut session = bound_session(&server, &clock).await;
    session.disconnect();

    let before = clock.now();
    let options = WaitOptions::new(Duration::from_secs(60), Duration::from_secs(5));
    assert!(session.wait_for_message(&options).await.is_none());

    assert_eq!(clock.now() - before, chrono::Duration::seconds(5));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_wait_for_code_skips_seen_messages() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;

    let welcome = record("welcome", "Welcome", None);
    let code = with_text(record("code", "Your code", None), "Use 482913 to sign in");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([welcome.clone()])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_inbox(&server, json!([welcome, code])).await;

    let options = WaitOptions::new(Duration::from_secs(60), Duration::from_secs(5));
    let (message, found) = session.wait_for_code(&options).await.unwrap();

    assert_eq!(message.id(), "code");
    assert_eq!(found, "482913");
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_wait_for_link_and_match() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;

    let mut message = record("m1", "Confirm", None);
    message["html"] =
        json!(r#"<p>Ref KEY-7731</p><a href="https://service.test/verify?t=1">Verify</a>"#);
    mount_inbox(&server, json!([message])).await;

    let options = WaitOptions::new(Duration::from_secs(30), Duration::from_secs(5));

    let (_, link) = session.wait_for_link(Some("verify"), &options).await.unwrap();
    assert_eq!(link, "https://service.test/verify?t=1");

    let matcher = RegexMatcher::case_insensitive(r"key-(\d+)").unwrap();
    let (_, found) = session.wait_for_match(&matcher, &options).await.unwrap();
    assert_eq!(found, "7731");
}

#[tokio::test]
async fn test_wait_cancelled() {
    let server = MockServer::start().await;
    let session = bound_session(&server, &ManualClock::new()).await;
    mount_inbox(&server, json!([])).await;

    let options = WaitOptions::new(Duration::from_secs(3600), Duration::from_secs(5));
    let message = session
        .wait_for_message_until(&options, std::future::ready(()))
        .await;

    assert!(message.is_none());
}
