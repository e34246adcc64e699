//! End-to-end tests: client -> proxy -> upstream GraphQL server.

use armature_graphql_middleware::prelude::*;
use armature_graphql_middleware::HeaderMap;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILMS: &str = "query films { allFilms { title } }";
const FILM_BY_ID: &str = "query filmById($id: ID!) { film(id: $id) { title } }";

fn registry() -> Arc<StaticDocumentRegistry> {
    Arc::new(
        StaticDocumentRegistry::new()
            .with_query("films", FILMS)
            .with_query("filmById", FILM_BY_ID),
    )
}

fn client(proxy: GraphQLProxy) -> GraphQLClient {
    GraphQLClient::with_transport(InProcessTransport::new(Arc::new(proxy)))
}

#[tokio::test]
async fn test_full_override_serves_without_upstream() {
    let hooks = HookSet::new().full_override(|ctx| async move {
        Ok(GraphQLResponse::from_data(json!({
            "operation": ctx.operation_name(),
            "variables": ctx.variables().clone(),
        })))
    });
    let proxy = GraphQLProxy::new(
        ProxyConfig::new("http://127.0.0.1:1/graphql"),
        hooks,
        registry(),
    )
    .unwrap();

    let response = client(proxy)
        .query("filmById", Some(json!({ "id": "1" })), None)
        .await
        .unwrap();

    assert_eq!(
        response.data,
        Some(json!({ "operation": "filmById", "variables": { "id": "1" } }))
    );
}

#[tokio::test]
async fn test_hooks_route_by_client_context_and_forward_cookies() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/de/graphql"))
        .and(header("cookie", "session=abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "allFilms": [] } })),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let base = upstream.uri();
    let hooks = HookSet::new()
        .resolve_endpoint(move |ctx| {
            let base = base.clone();
            async move {
                let language = ctx.client_context("language").unwrap_or("en");
                Ok(format!("{}/{}/graphql", base, language))
            }
        })
        .resolve_transport_options(|ctx| async move {
            let mut options = TransportOptions::new();
            if let Some(cookie) = ctx.request_header("cookie") {
                options = options.header("Cookie", cookie);
            }
            Ok(options)
        });
    let proxy = GraphQLProxy::new(ProxyConfig::default(), hooks, registry()).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("cookie", "session=abc".parse().unwrap());
    let client = GraphQLClient::with_transport(
        InProcessTransport::new(Arc::new(proxy)).with_headers(headers),
    );

    let response = client
        .query_with(
            InvokeArgs::new("films")
                .fetch_options(FetchOptions::new().client_context("language", "de")),
        )
        .await
        .unwrap();

    assert_eq!(response.data, Some(json!({ "allFilms": [] })));
}

#[tokio::test]
async fn test_server_rendered_snapshot_hydrates_client_cache() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "film": { "title": "A New Hope" } }
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let proxy = GraphQLProxy::new(
        ProxyConfig::new(format!("{}/graphql", upstream.uri())),
        HookSet::new(),
        registry(),
    )
    .unwrap();
    let proxy = Arc::new(proxy);

    // Render pass: fetch through the proxy and fill a cache.
    let server_cache = InMemoryPayloadCache::new();
    let server_client = GraphQLClient::with_transport(InProcessTransport::new(proxy.clone()))
        .with_cache(server_cache.clone());
    let (_server_vars, rx) = watch::channel(Some(json!({ "id": "1" })));
    let server_watcher = server_client.watch_query("filmById", rx, WatchOptions::new());
    assert!(server_watcher.settled().await.response().is_some());

    // Hydration: the snapshot answers without another upstream call.
    let client = GraphQLClient::with_transport(InProcessTransport::new(proxy))
        .with_cache(InMemoryPayloadCache::seeded(server_cache.snapshot()));
    let (_vars, rx) = watch::channel(Some(json!({ "id": "1" })));
    let watcher = client.watch_query("filmById", rx, WatchOptions::new().trust_cache(true));

    let state = watcher.state();
    assert!(matches!(state, QueryState::Settled { .. }));
    assert_eq!(
        state.response().unwrap().data.as_ref().unwrap()["film"]["title"],
        "A New Hope"
    );
    assert_eq!(watcher.dispatch_count(), 0);
}
