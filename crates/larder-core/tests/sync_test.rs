// End-to-end tests for the synchronization layer: a real wiremock
// backend behind an ApiClient, a Session in front, and list screens
// driven through their controllers.

use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use larder_api::types::MilestonePayload;
use larder_api::ApiClient;
use larder_core::Session;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let client = ApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, Session::from_client(client))
}

fn milestone_body(id: &Uuid, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "iconUrl": null,
        "points": 10,
        "requirementCount": 0,
        "archived": false,
        "createdAt": "2024-05-01T12:00:00Z"
    })
}

fn milestone_page(items: Vec<serde_json::Value>) -> serde_json::Value {
    let count = items.len();
    json!({
        "currentPage": 1,
        "totalPages": if count == 0 { 0 } else { 1 },
        "pageSize": 50,
        "totalCount": count,
        "hasPrevious": false,
        "hasNext": false,
        "items": items
    })
}

// ── Search flow ─────────────────────────────────────────────────────

#[tokio::test]
async fn searching_a_list_narrows_results_through_the_cache() {
    let (server, session) = setup().await;
    let apple_pie = Uuid::new_v4();
    let apple_jam = Uuid::new_v4();
    let bread = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/milestones"))
        .and(query_param("searchText", "apple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(milestone_page(vec![
            milestone_body(&apple_pie, "Apple pie badge"),
            milestone_body(&apple_jam, "Apple jam badge"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/milestones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(milestone_page(vec![
            milestone_body(&apple_pie, "Apple pie badge"),
            milestone_body(&apple_jam, "Apple jam badge"),
            milestone_body(&bread, "Bread badge"),
        ])))
        .mount(&server)
        .await;

    let mut milestones = session.milestones();

    let unfiltered = milestones.load().await;
    assert!(!unfiltered.is_loading);
    assert_eq!(unfiltered.data.unwrap().items.len(), 3);

    milestones.set_search("apple");

    // The narrowed key has never been fetched: no data yet, not loading.
    let before = milestones.state();
    assert!(before.data.is_none());
    assert!(!before.is_loading);

    let filtered = milestones.load().await;
    assert!(!filtered.is_loading);
    assert!(!filtered.is_error);
    let page = filtered.data.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|m| m.name.contains("Apple")));

    // Dropping the search restores the cached unfiltered page without
    // another request.
    let requests_before = server.received_requests().await.unwrap().len();
    milestones.clear_filter("searchText");
    let restored = milestones.load().await;
    assert_eq!(restored.data.unwrap().items.len(), 3);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_before
    );
}

// ── Write-then-read flow ────────────────────────────────────────────

#[tokio::test]
async fn a_committed_create_makes_the_next_list_read_hit_the_network() {
    let (server, session) = setup().await;
    let existing = Uuid::new_v4();
    let created = Uuid::new_v4();

    // First list read, consumed exactly once.
    Mock::given(method("GET"))
        .and(path("/milestones"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(milestone_page(vec![milestone_body(&existing, "Old badge")])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let milestones = session.milestones();
    let before = milestones.load().await;
    assert_eq!(before.data.unwrap().items.len(), 1);

    // The create commits, then the list serves both rows.
    Mock::given(method("POST"))
        .and(path("/milestones"))
        .and(body_partial_json(json!({ "name": "New badge" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(milestone_body(&created, "New badge")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/milestones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(milestone_page(vec![
            milestone_body(&existing, "Old badge"),
            milestone_body(&created, "New badge"),
        ])))
        .mount(&server)
        .await;

    let milestone = session
        .create_milestone(MilestonePayload {
            name: "New badge".into(),
            description: None,
            points: 10,
            archived: false,
        })
        .await
        .unwrap();
    assert_eq!(milestone.name, "New badge");

    // Same filters, same key — but the write marked it stale.
    let after = milestones.load().await;
    let page = after.data.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().any(|m| m.id == created));
}

#[tokio::test]
async fn requirement_writes_invalidate_the_parent_milestone_list() {
    let (server, session) = setup().await;
    let milestone_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/milestones"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(milestone_page(vec![milestone_body(&milestone_id, "Badge")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!(
            "/milestones/{milestone_id}/requirements/{}",
            Uuid::nil()
        )))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let milestones = session.milestones();
    milestones.load().await;
    let list_reads = |requests: &[wiremock::Request]| {
        requests
            .iter()
            .filter(|r| r.method == wiremock::http::Method::GET && r.url.path() == "/milestones")
            .count()
    };
    assert_eq!(list_reads(&server.received_requests().await.unwrap()), 1);

    session
        .delete_requirement(milestone_id, Uuid::nil())
        .await
        .unwrap();

    // Requirement counts are embedded in milestone rows, so the list
    // revalidates even though no milestone was written directly.
    milestones.load().await;
    assert_eq!(list_reads(&server.received_requests().await.unwrap()), 2);
}

// ── Conflict flow ───────────────────────────────────────────────────

#[tokio::test]
async fn a_rejected_delete_surfaces_the_backend_detail_verbatim() {
    let (server, session) = setup().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/milestones"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(milestone_page(vec![milestone_body(&id, "Earned badge")])),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/milestones/{id}")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "title": "Milestone.InUse",
            "detail": "Milestone cannot be deleted while users have earned it",
            "status": 409
        })))
        .mount(&server)
        .await;

    let milestones = session.milestones();
    milestones.load().await;

    let err = session.delete_milestone(id).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        err.user_message("something went wrong"),
        "Milestone cannot be deleted while users have earned it"
    );

    // Failed write: the cached list is still fresh, so this read does
    // not touch the network (the single list mock is exhausted but no
    // second GET is issued).
    let state = milestones.load().await;
    assert_eq!(state.data.unwrap().items.len(), 1);
    assert!(!state.is_error);
}

// ── Absorbed read failures ──────────────────────────────────────────

#[tokio::test]
async fn a_failing_list_read_renders_as_an_empty_page() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/milestones"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let milestones = session.milestones();
    let state = milestones.load().await;

    // Collection reads absorb failures into an empty page.
    assert!(!state.is_error);
    let page = state.data.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total_pages, 0);
}

// ── Session lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn ending_the_session_drops_all_cached_state() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/milestones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(milestone_page(vec![])))
        .mount(&server)
        .await;

    let milestones = session.milestones();
    milestones.load().await;
    assert!(!session.registry().is_empty());

    session.end();
    assert!(session.registry().is_empty());

    // The next load is a cold read against the same key.
    milestones.load().await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
