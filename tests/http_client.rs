// tests/http_client.rs
//! The blocking HTTP transport against a local mock server.

use mockito::{Matcher, Server};
use notion_query::{
    prop, ApiKey, AppError, DatabaseId, NotionErrorCode, NotionHttpClient, NotionTransport,
    Query, Session, ValidatedUrl,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const TOKEN: &str = "secret_0123456789abcdefghijklmnop";

fn client_for(server: &Server) -> NotionHttpClient {
    let api_key = ApiKey::new(TOKEN).unwrap();
    let base_url = ValidatedUrl::parse(&format!("{}/v1/", server.url())).unwrap();
    NotionHttpClient::with_base_url(&api_key, &base_url).unwrap()
}

#[test]
fn sends_auth_and_version_headers() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v1/users/me")
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .match_header("notion-version", "2022-06-28")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"object":"user","id":"11111111-2222-3333-4444-555555555555","name":"Bot"}"#)
        .create();

    let body = client_for(&server).get("users/me").unwrap();
    assert_eq!(body["name"], json!("Bot"));
    mock.assert();
}

#[test]
fn maps_error_bodies_to_codes() {
    let mut server = Server::new();
    server
        .mock("GET", "/v1/databases/01234567-89ab-cdef-0123-456789abcdef")
        .with_status(404)
        .with_body(
            r#"{"object":"error","status":404,"code":"object_not_found","message":"Could not find database"}"#,
        )
        .create();

    let err = client_for(&server)
        .get("databases/01234567-89ab-cdef-0123-456789abcdef")
        .unwrap_err();
    match err {
        AppError::NotionService {
            code,
            message,
            status,
        } => {
            assert_eq!(code, NotionErrorCode::ObjectNotFound);
            assert_eq!(message, "Could not find database");
            assert_eq!(status, 404);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn unparseable_errors_fall_back_to_status() {
    let mut server = Server::new();
    server
        .mock("POST", "/v1/search")
        .with_status(502)
        .with_body("<html>bad gateway</html>")
        .create();

    let err = client_for(&server).post("search", &json!({})).unwrap_err();
    assert!(matches!(
        err,
        AppError::NotionService {
            code: NotionErrorCode::HttpStatus(502),
            status: 502,
            ..
        }
    ));
}

#[test]
fn malformed_success_body_is_reported() {
    let mut server = Server::new();
    server
        .mock("GET", "/v1/users/me")
        .with_status(200)
        .with_body("not json")
        .create();

    let err = client_for(&server).get("users/me").unwrap_err();
    assert!(matches!(err, AppError::MalformedResponse(_)));
}

#[test]
fn query_round_trip_over_http() {
    let mut server = Server::new();
    server
        .mock("GET", "/v1/databases/01234567-89ab-cdef-0123-456789abcdef")
        .with_status(200)
        .with_body(
            json!({
                "object": "database",
                "id": "01234567-89ab-cdef-0123-456789abcdef",
                "title": [{"plain_text": "Tasks"}],
                "properties": {
                    "Name": {"id": "title", "type": "title", "title": {}},
                    "Done": {"id": "d", "type": "checkbox", "checkbox": {}}
                }
            })
            .to_string(),
        )
        .create();
    let query_mock = server
        .mock("POST", "/v1/databases/01234567-89ab-cdef-0123-456789abcdef/query")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "filter": {"property": "Done", "checkbox": {"equals": false}},
            "sorts": [{"property": "Name", "direction": "ascending"}],
            "page_size": 50
        })))
        .with_status(200)
        .with_body(
            json!({
                "object": "list",
                "results": [{
                    "object": "page",
                    "id": "00000000-0000-0000-0000-000000000001",
                    "properties": {
                        "Name": {"id": "title", "type": "title", "title": [{"plain_text": "Write tests"}]},
                        "Done": {"id": "d", "type": "checkbox", "checkbox": false}
                    }
                }],
                "next_cursor": null,
                "has_more": false
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let session = Session::new(client_for(&server));
    let id = DatabaseId::parse("01234567-89ab-cdef-0123-456789abcdef").unwrap();
    let query = Query::new()
        .filter(prop("Done").equals(false))
        .sort([prop("Name").asc()])
        .page_size(50);
    let titles: Vec<String> = session
        .query_database(&id, &query)
        .unwrap()
        .map(|row| row.unwrap().title().unwrap_or_default())
        .collect();

    assert_eq!(titles, ["Write tests"]);
    query_mock.assert();
}
