// Integration tests for `GatewayClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use junghome_api::{Error, GatewayClient, PatchBody, PatchOutcome};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, GatewayClient) {
    let server = MockServer::start().await;
    let http = reqwest::Client::builder()
        .default_headers({
            let mut h = reqwest::header::HeaderMap::new();
            h.insert("token", "secret-token".parse().unwrap());
            h
        })
        .build()
        .unwrap();
    let client = GatewayClient::from_reqwest(&server.uri(), http).unwrap();
    (server, client)
}

fn catalog() -> serde_json::Value {
    json!([
        {
            "id": "f-cover",
            "type": "Position",
            "label": "Living room blind",
            "datapoints": [
                { "id": "dp-level", "type": "level", "values": [{ "key": "level", "value": "30" }] }
            ]
        },
        {
            "id": "f-light",
            "type": "OnOff",
            "label": "Hallway",
            "datapoints": [
                { "id": "dp-switch", "type": "switch", "values": [{ "key": "switch", "value": "NaN" }] }
            ]
        }
    ])
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_functions_sends_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/"))
        .and(header("token", "secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = client.list_functions().await.unwrap();
    let functions = &catalog.functions;

    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0].id, "f-cover");
    assert_eq!(functions[0].kind, "Position");
    assert_eq!(functions[1].datapoints[0].values[0].value, "NaN");
}

#[tokio::test]
async fn test_list_functions_skips_malformed_entries() {
    let (server, client) = setup().await;

    let mut entries = catalog();
    let list = entries.as_array_mut().unwrap();
    list.push(json!({ "label": "no id" }));
    list.push(json!({ "id": "f-broken", "type": "OnOff", "datapoints": [{ "type": "switch" }] }));

    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entries))
        .mount(&server)
        .await;

    let catalog = client.list_functions().await.unwrap();

    let ids: Vec<&str> = catalog.functions.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f-cover", "f-light"]);
    assert_eq!(catalog.unparsed, vec!["f-broken".to_string()]);
}

#[tokio::test]
async fn test_hub_config() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/junghome/config/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version_release": "2.1.0",
            "version_up_to_date": false,
            "ip_address": "192.168.1.20",
            "ip_error": false,
            "cloud_register": true,
            "cloud_error": false,
            "system_serial": "JH-0001"
        })))
        .mount(&server)
        .await;

    let cfg = client.hub_config().await.unwrap();
    assert_eq!(cfg.version_release.as_deref(), Some("2.1.0"));
    assert_eq!(cfg.version_up_to_date, Some(false));
    assert_eq!(cfg.system_serial.as_deref(), Some("JH-0001"));
}

#[tokio::test]
async fn test_read_datapoint() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/f-cover/datapoints/dp-level"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{ "key": "level", "value": "70" }]
        })))
        .mount(&server)
        .await;

    let values = client.datapoint("f-cover", "dp-level").await.unwrap();
    assert_eq!(values.get("level"), Some("70"));
    assert_eq!(values.get("level_move"), None);
}

#[tokio::test]
async fn test_patch_with_empty_body_is_accepted() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/junghome/functions/f-light/datapoints/dp-switch"))
        .and(body_json(json!({ "data": [{ "key": "switch", "value": "1" }] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client
        .set_datapoint("f-light", "dp-switch", &PatchBody::single("switch", "1"))
        .await
        .unwrap();
    assert_eq!(outcome, PatchOutcome::Accepted);
}

#[tokio::test]
async fn test_patch_with_plain_text_body_is_accepted() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/junghome/functions/f-light/datapoints/dp-switch"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let outcome = client
        .set_datapoint("f-light", "dp-switch", &PatchBody::single("switch", "0"))
        .await
        .unwrap();
    assert_eq!(outcome.into_value(), json!({ "success": true }));
}

#[tokio::test]
async fn test_patch_echo_is_returned() {
    let (server, client) = setup().await;

    let echo = json!({ "id": "dp-level", "values": [{ "key": "level", "value": "40" }] });
    Mock::given(method("PATCH"))
        .and(path("/api/junghome/functions/f-cover/datapoints/dp-level"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&echo))
        .mount(&server)
        .await;

    let outcome = client
        .set_datapoint("f-cover", "dp-level", &PatchBody::single("level", "40"))
        .await
        .unwrap();
    assert_eq!(outcome, PatchOutcome::Echo(echo));
}

// ── Error mapping tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_401_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_functions().await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got {err:?}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_404_maps_to_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/junghome/functions/gone/datapoints/dp"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .set_datapoint("gone", "dp", &PatchBody::single("switch", "1"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_500_embeds_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/junghome/config/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .mount(&server)
        .await;

    let err = client.hub_config().await.unwrap_err();
    match err {
        Error::Status { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "warming up");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_json_maps_to_decode() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client.list_functions().await.unwrap_err();
    assert!(err.is_decode());
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>not json</html>"),
        other => panic!("unexpected error: {other:?}"),
    }
}
