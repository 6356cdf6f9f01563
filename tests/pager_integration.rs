use std::sync::Arc;

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appnexus_api_client::auth::StaticCredentials;
use appnexus_api_client::error::ErrorKind;
use appnexus_api_client::rest::{AppNexusClient, FieldFilter};

async fn setup() -> (MockServer, AppNexusClient) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "status": "OK", "token": "tok-1" }
        })))
        .mount(&server)
        .await;

    let client = AppNexusClient::builder()
        .base_url(server.uri())
        .credentials(Arc::new(StaticCredentials::new("api_user", "secret")))
        .max_retries(0)
        .build()
        .unwrap();
    (server, client)
}

fn campaigns(range: std::ops::Range<u64>) -> Vec<Value> {
    range
        .map(|id| {
            let state = if id % 2 == 0 { "active" } else { "inactive" };
            json!({ "id": id, "state": state })
        })
        .collect()
}

fn page(items: Vec<Value>, start: u64, count: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "response": {
            "status": "OK",
            "count": count,
            "start_element": start,
            "num_elements": items.len(),
            "campaigns": items
        }
    }))
}

async fn mount_page(server: &MockServer, start: u64, num: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/campaign"))
        .and(query_param("advertiser_id", "10"))
        .and(query_param("start_element", start.to_string()))
        .and(query_param("num_elements", num.to_string()))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_all_walks_every_page() {
    let (server, client) = setup().await;
    mount_page(&server, 0, 100, page(campaigns(0..100), 0, 250)).await;
    mount_page(&server, 100, 100, page(campaigns(100..200), 100, 250)).await;
    mount_page(&server, 200, 100, page(campaigns(200..250), 200, 250)).await;

    let items = client
        .get_all("campaigns", "/campaign?advertiser_id=10", &[])
        .await
        .unwrap();

    assert_eq!(items.len(), 250);
    assert_eq!(items[0]["id"], 0);
    assert_eq!(items[249]["id"], 249);
}

#[tokio::test]
async fn test_get_all_applies_filters_after_counting() {
    let (server, client) = setup().await;
    mount_page(&server, 0, 100, page(campaigns(0..100), 0, 150)).await;
    mount_page(&server, 100, 100, page(campaigns(100..150), 100, 150)).await;

    let items = client
        .get_all(
            "campaigns",
            "/campaign?advertiser_id=10",
            &[FieldFilter::new("state", "active")],
        )
        .await
        .unwrap();

    assert_eq!(items.len(), 75);
    assert!(items.iter().all(|item| item["state"] == "active"));
}

#[tokio::test]
async fn test_pager_with_custom_page_size() {
    let (server, client) = setup().await;
    mount_page(&server, 0, 40, page(campaigns(0..40), 0, 90)).await;
    mount_page(&server, 40, 40, page(campaigns(40..80), 40, 90)).await;
    mount_page(&server, 80, 40, page(campaigns(80..90), 80, 90)).await;

    let items = client
        .pager("campaigns", "/campaign?advertiser_id=10")
        .page_size(40)
        .filter(FieldFilter::new("state", "inactive"))
        .fetch_all()
        .await
        .unwrap();

    assert_eq!(items.len(), 45);
}

#[tokio::test]
async fn test_short_page_advances_by_returned_count() {
    let (server, client) = setup().await;
    // The server caps pages at 60 items whatever was requested.
    mount_page(&server, 0, 100, page(campaigns(0..60), 0, 120)).await;
    mount_page(&server, 60, 100, page(campaigns(60..120), 60, 120)).await;

    let items = client
        .get_all("campaigns", "/campaign?advertiser_id=10", &[])
        .await
        .unwrap();
    assert_eq!(items.len(), 120);
}

#[tokio::test]
async fn test_empty_page_stops_paging() {
    let (server, client) = setup().await;
    mount_page(&server, 0, 100, page(campaigns(0..100), 0, 500)).await;
    mount_page(&server, 100, 100, page(Vec::new(), 100, 500)).await;

    let items = client
        .get_all("campaigns", "/campaign?advertiser_id=10", &[])
        .await
        .unwrap();
    assert_eq!(items.len(), 100);
}

#[tokio::test]
async fn test_missing_count_stops_after_first_page() {
    let (server, client) = setup().await;
    mount_page(
        &server,
        0,
        100,
        ResponseTemplate::new(200).set_body_json(json!({
            "response": { "status": "OK", "campaigns": campaigns(0..3) }
        })),
    )
    .await;

    let items = client
        .get_all("campaigns", "/campaign?advertiser_id=10", &[])
        .await
        .unwrap();
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn test_not_found_collection_is_empty() {
    let (server, client) = setup().await;
    mount_page(
        &server,
        0,
        100,
        ResponseTemplate::new(404).set_body_json(json!({
            "response": { "error_id": "NOTFOUND", "error": "No campaigns found" }
        })),
    )
    .await;

    let items = client
        .get_all("campaigns", "/campaign?advertiser_id=10", &[])
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_fatal_error_mid_collection_fails() {
    let (server, client) = setup().await;
    mount_page(&server, 0, 100, page(campaigns(0..100), 0, 200)).await;
    mount_page(
        &server,
        100,
        100,
        ResponseTemplate::new(500).set_body_json(json!({
            "response": { "error_id": "SYSTEM", "error": "Internal error" }
        })),
    )
    .await;

    let err = client
        .get_all("campaigns", "/campaign?advertiser_id=10", &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::System));
}

#[tokio::test]
async fn test_get_collection_single_shot() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/segment"))
        .and(query_param("member_id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "status": "OK", "segments": [{"id": 1}, {"id": 2}] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/segment"))
        .and(query_param("member_id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "error_id": "NOTFOUND", "error": "none" }
        })))
        .mount(&server)
        .await;

    let found = client.get_collection("segments", "/segment?member_id=3").await.unwrap();
    assert_eq!(found.len(), 2);

    let missing = client.get_collection("segments", "/segment?member_id=4").await.unwrap();
    assert!(missing.is_empty());
}
