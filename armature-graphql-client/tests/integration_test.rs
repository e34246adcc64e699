//! Integration tests for armature-graphql-client.

use armature_graphql_client::*;
use armature_graphql_proxy::{GraphQLProxy, HookSet, ProxyConfig, StaticDocumentRegistry};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREFIX: &str = "/api/graphql_middleware";
const FILM_BY_ID: &str = "query filmById($id: ID!) { film(id: $id) { title } }";
const ADD_FILM: &str = "mutation addFilm($title: String!) { addFilm(title: $title) { id } }";

fn http_client(server: &MockServer) -> GraphQLClient {
    GraphQLClient::new(GraphQLClientConfig::new(server.uri())).unwrap()
}

fn in_process_client(upstream: &MockServer) -> GraphQLClient {
    let registry = StaticDocumentRegistry::new()
        .with_query("filmById", FILM_BY_ID)
        .with_mutation("addFilm", ADD_FILM);
    let proxy = GraphQLProxy::new(
        ProxyConfig::new(format!("{}/graphql", upstream.uri())),
        HookSet::new(),
        Arc::new(registry),
    )
    .unwrap();

    GraphQLClient::with_transport(InProcessTransport::new(Arc::new(proxy)))
}

#[tokio::test]
async fn test_http_query_uses_get_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/query/filmById", PREFIX)))
        .and(query_param("id", "123"))
        .and(query_param("__gqlc_language", "de"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "film": { "title": "A New Hope" } } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = http_client(&server)
        .query(
            "filmById",
            Some(json!({ "id": "123" })),
            Some(FetchOptions::new().client_context("language", "de")),
        )
        .await
        .unwrap();

    assert_eq!(response.data.unwrap()["film"]["title"], "A New Hope");
}

#[tokio::test]
async fn test_http_mutation_posts_variables() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/mutation/addFilm", PREFIX)))
        .and(header("x-request-id", "42"))
        .and(body_json(json!({ "title": "Rogue One" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "addFilm": { "id": "7" } } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = http_client(&server)
        .mutation_with(
            InvokeArgs::new("addFilm")
                .variable("title", "Rogue One")
                .fetch_options(FetchOptions::new().header("x-request-id", "42")),
        )
        .await
        .unwrap();

    assert_eq!(response.data.unwrap()["addFilm"]["id"], "7");
}

#[tokio::test]
async fn test_http_proxy_error_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "statusCode": 404,
            "message": "Unknown operation: missing"
        })))
        .mount(&server)
        .await;

    let err = http_client(&server)
        .query("missing", None, None)
        .await
        .unwrap_err();

    assert!(err.is_proxy_error());
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_in_process_round_trip() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({
            "query": FILM_BY_ID,
            "variables": { "id": "123" },
            "operationName": "filmById"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "film": { "title": "A New Hope" } } })),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let response = in_process_client(&upstream)
        .query("filmById", Some(json!({ "id": "123" })), None)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "data": { "film": { "title": "A New Hope" } } })
    );
}

#[tokio::test]
async fn test_in_process_upstream_failure() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&upstream)
        .await;

    let err = in_process_client(&upstream)
        .mutation("addFilm", Some(json!({ "title": "X" })), None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_watcher_trusts_seeded_cache() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "film": null } })))
        .expect(0)
        .mount(&upstream)
        .await;

    let key = OperationKey::build(OperationKind::Query, "filmById", Some(&json!({ "id": "1" })));
    let source = InMemoryPayloadCache::new();
    source.set(
        &key,
        GraphQLResponse::from_data(json!({ "film": { "title": "Cached" } })),
    );

    let client =
        in_process_client(&upstream).with_cache(InMemoryPayloadCache::seeded(source.snapshot()));
    let (_vars, rx) = watch::channel(Some(json!({ "id": "1" })));
    let watcher = client.watch_query("filmById", rx, WatchOptions::new().trust_cache(true));

    let state = watcher.settled().await;
    assert_eq!(
        state.response().unwrap().data.as_ref().unwrap()["film"]["title"],
        "Cached"
    );
    assert_eq!(watcher.dispatch_count(), 0);
}

#[tokio::test]
async fn test_watcher_follows_variables() {
    let upstream = MockServer::start().await;
    for (id, title) in [("1", "A New Hope"), ("2", "The Empire Strikes Back")] {
        Mock::given(method("POST"))
            .and(body_json(json!({
                "query": FILM_BY_ID,
                "variables": { "id": id },
                "operationName": "filmById"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "film": { "title": title } } })),
            )
            .expect(1)
            .mount(&upstream)
            .await;
    }

    let cache = InMemoryPayloadCache::new();
    let client = in_process_client(&upstream).with_cache(cache.clone());
    let (vars, rx) = watch::channel(Some(json!({ "id": "1" })));
    let watcher = client.watch_query("filmById", rx, WatchOptions::new());

    let state = watcher.settled().await;
    assert_eq!(
        state.response().unwrap().data.as_ref().unwrap()["film"]["title"],
        "A New Hope"
    );

    vars.send(Some(json!({ "id": "2" }))).unwrap();
    let state = watcher.settled().await;
    assert_eq!(
        state.response().unwrap().data.as_ref().unwrap()["film"]["title"],
        "The Empire Strikes Back"
    );

    assert_eq!(watcher.dispatch_count(), 2);
    assert_eq!(cache.len(), 2);
}
