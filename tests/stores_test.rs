use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bookscout::domain::DomainError;
use bookscout::infrastructure::backend::BackendClient;
use bookscout::integrations::google_books::CatalogClient;
use bookscout::models::book::Book;
use bookscout::notify::{NoticeKind, Notifier};
use bookscout::stores::auth::{AuthStore, Session};
use bookscout::stores::favorites::FavoritesStore;
use bookscout::stores::search::SearchStore;

// --- helpers ---------------------------------------------------------------

fn volume(id: &str) -> serde_json::Value {
    json!({ "id": id, "volumeInfo": { "title": format!("Title {}", id) } })
}

fn page(total_items: u32, ids: Vec<String>) -> serde_json::Value {
    let items: Vec<_> = ids.iter().map(|id| volume(id)).collect();
    json!({ "kind": "books#volumes", "totalItems": total_items, "items": items })
}

fn ids(prefix: &str, range: std::ops::Range<u32>) -> Vec<String> {
    range.map(|i| format!("{}{}", prefix, i)).collect()
}

fn book(id: &str, title: &str) -> Book {
    serde_json::from_value(json!({ "id": id, "volumeInfo": { "title": title } })).unwrap()
}

fn favorite_row(user_id: &str, book_id: &str, title: &str) -> serde_json::Value {
    json!({
        "user_id": user_id,
        "book_id": book_id,
        "book_data": { "id": book_id, "title": title },
        "created_at": "2024-01-05T10:00:00Z"
    })
}

fn search_store(server: &MockServer) -> (Arc<SearchStore>, Notifier) {
    let catalog = CatalogClient::new(format!("{}/volumes", server.uri()), None).unwrap();
    let notifier = Notifier::default();
    let store = Arc::new(SearchStore::new(Arc::new(catalog), notifier.clone()));
    (store, notifier)
}

fn backend(server: &MockServer) -> Arc<BackendClient> {
    Arc::new(BackendClient::new(&server.uri(), "anon-key").unwrap())
}

async fn mock_password_grant(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "bearer",
            "user": {
                "id": "u1",
                "email": "reader@example.com",
                "user_metadata": { "username": "reader" }
            }
        })))
        .mount(server)
        .await;
}

/// Auth + favorites stores wired over one backend client, already signed in.
async fn signed_in_stores(server: &MockServer) -> (Arc<AuthStore>, FavoritesStore, Notifier) {
    mock_password_grant(server).await;

    let backend = backend(server);
    let notifier = Notifier::default();
    let auth = Arc::new(AuthStore::new(
        backend.clone(),
        notifier.clone(),
    ));
    auth.login("reader@example.com", "hunter2").await.unwrap();

    let favorites = FavoritesStore::new(
        backend,
        auth.clone(),
        notifier.clone(),
    );
    (auth, favorites, notifier)
}

// --- search/browse store ---------------------------------------------------

#[tokio::test]
async fn search_sets_query_and_holds_first_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "dune"))
        .and(query_param("startIndex", "0"))
        .and(query_param("maxResults", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(47, ids("d", 0..20))))
        .mount(&server)
        .await;

    let (store, _) = search_store(&server);
    store.search("dune").await.unwrap();

    let state = store.snapshot().await;
    assert_eq!(state.query, "dune");
    assert_eq!(state.books.len(), 20);
    assert_eq!(state.total_items, 47);
    assert!(state.has_more());
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn load_more_extends_the_held_prefix() {
    let server = MockServer::start().await;
    for (start, end, total) in [(0u32, 20u32, 47u32), (20, 40, 47), (40, 47, 47)] {
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .and(query_param("q", "dune"))
            .and(query_param("startIndex", start.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(total, ids("d", start..end))))
            .mount(&server)
            .await;
    }

    let (store, _) = search_store(&server);
    store.search("dune").await.unwrap();
    let before = store.snapshot().await.books;

    store.load_more(20).await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.books.len(), 40);
    assert!(state.has_more());
    // Append-only: the old held sequence is a prefix of the new one.
    assert_eq!(&state.books[..20], &before[..]);

    store.load_more(40).await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.books.len(), 47);
    assert!(!state.has_more());
    assert_eq!(state.books[46].id, "d46");
}

#[tokio::test]
async fn failed_search_clears_previous_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(47, ids("d", 0..20))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "crash"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (store, notifier) = search_store(&server);
    let mut notices = notifier.subscribe();

    store.search("dune").await.unwrap();
    let err = store.search("crash").await.unwrap_err();
    assert!(matches!(err, DomainError::CatalogUnavailable(_)));

    let state = store.snapshot().await;
    assert!(state.books.is_empty());
    assert_eq!(state.total_items, 0);
    assert!(!state.loading);
    assert!(state.error.is_some());

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.message, "Failed to search books");
}

#[tokio::test]
async fn superseded_search_result_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(1, ids("slow", 0..1)))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(1, ids("fast", 0..1))))
        .mount(&server)
        .await;

    let (store, _) = search_store(&server);

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.search("slow").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.search("fast").await.unwrap();
    slow.await.unwrap().unwrap();

    // The older request resolved last but must not overwrite the newer one.
    let state = store.snapshot().await;
    assert_eq!(state.query, "fast");
    assert_eq!(state.books.len(), 1);
    assert_eq!(state.books[0].id, "fast0");
    assert!(!state.loading);
}

#[tokio::test]
async fn newest_and_category_replace_results_without_touching_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(47, ids("d", 0..20))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "subject:fiction"))
        .and(query_param("orderBy", "newest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(2, ids("new", 0..2))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "subject:horror"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(3, ids("h", 0..3))))
        .mount(&server)
        .await;

    let (store, _) = search_store(&server);
    store.search("dune").await.unwrap();

    store.newest().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.books.len(), 2);
    assert_eq!(state.total_items, 2);
    assert_eq!(state.query, "dune");

    store.by_category("horror").await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.books.len(), 3);
    assert_eq!(state.books[0].id, "h0");
    assert_eq!(state.query, "dune");
}

#[tokio::test]
async fn fetch_by_id_fills_and_clears_the_detail_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes/B1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(volume("B1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/volumes/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (store, _) = search_store(&server);

    store.fetch_by_id("B1").await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.current_book.as_ref().unwrap().id, "B1");
    assert!(!state.detail_loading);

    let err = store.fetch_by_id("NOPE").await.unwrap_err();
    assert_eq!(err, DomainError::NotFound);
    let state = store.snapshot().await;
    assert!(state.current_book.is_none());
    assert!(state.error.is_some());
}

#[tokio::test]
async fn clear_resets_query_and_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("maxResults", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(5, ids("x", 0..5))))
        .mount(&server)
        .await;

    let catalog = CatalogClient::new(format!("{}/volumes", server.uri()), None).unwrap();
    let store = SearchStore::new(Arc::new(catalog), Notifier::default()).with_page_size(5);
    store.search("anything").await.unwrap();
    assert_eq!(store.snapshot().await.books.len(), 5);

    store.set_query("draft input").await;
    assert_eq!(store.snapshot().await.query, "draft input");

    store.clear().await;
    let state = store.snapshot().await;
    assert!(state.books.is_empty());
    assert!(state.query.is_empty());
    assert_eq!(state.total_items, 0);
}

// --- auth session store ----------------------------------------------------

#[tokio::test]
async fn login_reaches_authenticated_and_notifies() {
    let server = MockServer::start().await;
    mock_password_grant(&server).await;

    let notifier = Notifier::default();
    let mut notices = notifier.subscribe();
    let auth = AuthStore::new(backend(&server), notifier.clone());

    auth.login("reader@example.com", "hunter2").await.unwrap();

    match auth.session().await {
        Session::Authenticated(user) => {
            assert_eq!(user.id, "u1");
            assert_eq!(user.email, "reader@example.com");
            assert_eq!(user.username.as_deref(), Some("reader"));
        }
        other => panic!("expected authenticated session, got {:?}", other),
    }

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
}

#[tokio::test]
async fn rejected_login_returns_to_anonymous_with_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error_description": "Invalid login credentials" })),
        )
        .mount(&server)
        .await;

    let notifier = Notifier::default();
    let mut notices = notifier.subscribe();
    let auth = AuthStore::new(backend(&server), notifier.clone());

    let err = auth.login("reader@example.com", "wrong").await.unwrap_err();
    assert_eq!(err, DomainError::AuthFailed("Invalid login credentials".into()));
    assert_eq!(auth.session().await, Session::Anonymous);
    assert_eq!(auth.last_error().await.as_deref(), Some("Invalid login credentials"));

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.message, "Invalid login credentials");
}

#[tokio::test]
async fn duplicate_signup_is_reported_as_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "msg": "User already registered" })),
        )
        .mount(&server)
        .await;

    let auth = AuthStore::new(
        backend(&server),
        Notifier::default(),
    );

    let err = auth
        .signup("reader@example.com", "hunter2", Some("reader"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::AuthFailed("User already registered".into()));
    assert_eq!(auth.session().await, Session::Anonymous);
}

#[tokio::test]
async fn check_session_with_no_login_resolves_anonymous() {
    let server = MockServer::start().await;
    let auth = AuthStore::new(
        backend(&server),
        Notifier::default(),
    );

    // Idempotent and never an error, even called repeatedly.
    assert_eq!(auth.check_session().await, Session::Anonymous);
    assert_eq!(auth.check_session().await, Session::Anonymous);
    assert!(auth.last_error().await.is_none());
}

#[tokio::test]
async fn check_session_restores_user_from_backend() {
    let server = MockServer::start().await;
    mock_password_grant(&server).await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "reader@example.com",
            "user_metadata": { "username": "reader" }
        })))
        .mount(&server)
        .await;

    let auth = AuthStore::new(
        backend(&server),
        Notifier::default(),
    );
    auth.login("reader@example.com", "hunter2").await.unwrap();

    match auth.check_session().await {
        Session::Authenticated(user) => assert_eq!(user.id, "u1"),
        other => panic!("expected authenticated session, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_logout_keeps_the_session() {
    let server = MockServer::start().await;
    mock_password_grant(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "msg": "backend down" })))
        .mount(&server)
        .await;

    let auth = AuthStore::new(
        backend(&server),
        Notifier::default(),
    );
    auth.login("reader@example.com", "hunter2").await.unwrap();

    let err = auth.logout().await.unwrap_err();
    assert!(matches!(err, DomainError::AuthFailed(_)));
    assert!(matches!(auth.session().await, Session::Authenticated(_)));
}

#[tokio::test]
async fn logout_returns_to_anonymous() {
    let server = MockServer::start().await;
    mock_password_grant(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let auth = AuthStore::new(
        backend(&server),
        Notifier::default(),
    );
    auth.login("reader@example.com", "hunter2").await.unwrap();

    auth.logout().await.unwrap();
    assert_eq!(auth.session().await, Session::Anonymous);
}

// --- favorites synchronizer ------------------------------------------------

#[tokio::test]
async fn add_while_anonymous_is_a_reported_noop() {
    let server = MockServer::start().await;
    let notifier = Notifier::default();
    let auth = Arc::new(AuthStore::new(
        backend(&server),
        notifier.clone(),
    ));
    let favorites = FavoritesStore::new(
        backend(&server),
        auth,
        notifier.clone(),
    );
    let mut notices = notifier.subscribe();

    let err = favorites.add(&book("B1", "Dune")).await.unwrap_err();
    assert_eq!(err, DomainError::AuthRequired);
    assert!(favorites.snapshot().await.books.is_empty());
    assert_eq!(notices.recv().await.unwrap().kind, NoticeKind::Error);
}

#[tokio::test]
async fn second_add_of_same_book_reports_duplicate() {
    let server = MockServer::start().await;
    let (_auth, favorites, _notifier) = signed_in_stores(&server).await;

    // First duplicate check finds nothing; afterwards the row exists.
    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("book_id", "eq.B1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("book_id", "eq.B1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([favorite_row("u1", "B1", "Dune")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let dune = book("B1", "Dune");
    favorites.add(&dune).await.unwrap();
    assert_eq!(favorites.snapshot().await.books.len(), 1);

    let err = favorites.add(&dune).await.unwrap_err();
    assert_eq!(err, DomainError::DuplicateFavorite);
    // Still exactly one favorite for (user, book).
    assert_eq!(favorites.snapshot().await.books.len(), 1);
}

#[tokio::test]
async fn insert_conflict_from_lost_race_maps_to_duplicate() {
    let server = MockServer::start().await;
    let (_auth, favorites, _notifier) = signed_in_stores(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("book_id", "eq.B1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    // The pre-check passed but another client inserted first.
    Mock::given(method("POST"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let err = favorites.add(&book("B1", "Dune")).await.unwrap_err();
    assert_eq!(err, DomainError::DuplicateFavorite);
    assert!(favorites.snapshot().await.books.is_empty());
}

#[tokio::test]
async fn remove_of_absent_id_is_a_silent_noop() {
    let server = MockServer::start().await;
    let (_auth, favorites, _notifier) = signed_in_stores(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("book_id", "eq.NOPE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    favorites.remove("NOPE").await.unwrap();
    let state = favorites.snapshot().await;
    assert!(state.books.is_empty());
}

#[tokio::test]
async fn remove_drops_the_matching_entry() {
    let server = MockServer::start().await;
    let (_auth, favorites, _notifier) = signed_in_stores(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("book_id", "eq.B1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("book_id", "eq.B1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    favorites.add(&book("B1", "Dune")).await.unwrap();
    favorites.remove("B1").await.unwrap();
    assert!(favorites.snapshot().await.books.is_empty());
}

#[tokio::test]
async fn fetch_all_overwrites_local_state_and_is_idempotent() {
    let server = MockServer::start().await;
    let (_auth, favorites, _notifier) = signed_in_stores(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param_is_missing("book_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            favorite_row("u1", "F1", "Dune"),
            favorite_row("u1", "F2", "Hyperion"),
        ])))
        .mount(&server)
        .await;

    favorites.fetch_all().await.unwrap();
    let first = favorites.snapshot().await.books;
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id, "F1");
    assert_eq!(first[1].volume_info.title, "Hyperion");

    // No intervening add/remove: a second fetch yields the identical set.
    favorites.fetch_all().await.unwrap();
    let second = favorites.snapshot().await.books;
    assert_eq!(first, second);
}

#[tokio::test]
async fn fetch_all_requires_a_session() {
    let server = MockServer::start().await;
    let notifier = Notifier::default();
    let auth = Arc::new(AuthStore::new(
        backend(&server),
        notifier.clone(),
    ));
    let favorites = FavoritesStore::new(
        backend(&server),
        auth,
        notifier,
    );

    let err = favorites.fetch_all().await.unwrap_err();
    assert_eq!(err, DomainError::AuthRequired);
}
