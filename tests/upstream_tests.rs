use std::time::Duration;

use http_body_util::BodyExt;
use httpmock::MockServer;
use serde_json::json;
use starfish_gateway::services::upstream::{StarfishClient, Upstream, UpstreamError, QUERY_FORMAT};

const TOKEN: &str = "secret-token";

fn client(server: &MockServer, file_server: Option<String>) -> StarfishClient {
    StarfishClient::new(
        &server.url("/api"),
        TOKEN,
        Duration::from_secs(5),
        250,
        file_server,
    )
    .unwrap()
}

#[tokio::test]
async fn test_query_sends_filters_and_decodes_entries() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/api/query/")
                .header("authorization", "Bearer secret-token")
                .query_param("query", "tag=Collections:Projects type=f")
                .query_param("format", QUERY_FORMAT)
                .query_param("limit", "250")
                .query_param("sort_by", "parent_path,fn");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
                    {
                        "_id": 1,
                        "fn": "a.txt",
                        "parent_path": "/data",
                        "type": 32768,
                        "size": 10,
                        "mt": 1705316400,
                        "volume": "vol1",
                        "tags_explicit": "x,y"
                    },
                    { "fn": "b.txt", "parent_path": "/data" }
                ]));
        })
        .await;

    let entries = client(&server, None)
        .query("Collections:Projects", "type=f")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].filename, "a.txt");
    assert!(entries[0].is_file());
    assert_eq!(entries[0].tags_explicit(), vec!["x", "y"]);
    assert_eq!(entries[1].size, 0);
    assert_eq!(entries[1].natural_key(), "data/b.txt");
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let cases: [(u16, &str); 4] = [
        (401, "auth"),
        (404, "not-found"),
        (429, "rate"),
        (502, "other"),
    ];
    for (status, label) in cases {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/api/query/");
                then.status(status).body("upstream says no");
            })
            .await;

        let err = client(&server, None)
            .query("Collections:Projects", "type=f")
            .await
            .unwrap_err();
        match (label, err) {
            ("auth", UpstreamError::AuthenticationFailed) => {}
            ("not-found", UpstreamError::CollectionNotFound(tag)) => {
                assert_eq!(tag, "Collections:Projects")
            }
            ("rate", UpstreamError::RateLimited) => {}
            ("other", UpstreamError::Api { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream says no");
            }
            (label, other) => panic!("{label}: unexpected error {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/query/");
            then.status(200).body("not json");
        })
        .await;

    let err = client(&server, None)
        .query("Collections:Projects", "type=f")
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Decode(_)));
}

#[tokio::test]
async fn test_discover_collections_reads_tagset() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/api/tagset/Collections/")
                .query_param("limit", "1000")
                .query_param("with_private", "true");
            then.status(200).json_body(json!({
                "name": "Collections",
                "tag_names": [{ "name": "Projects" }, { "name": "Archive" }]
            }));
        })
        .await;

    let names = client(&server, None).discover_collections().await.unwrap();
    mock.assert_async().await;
    assert_eq!(names, vec!["Projects", "Archive"]);
}

#[tokio::test]
async fn test_fetch_object_streams_from_file_server() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/files/vol1/data/a.txt")
                .header("X-Internal-Token", TOKEN);
            then.status(200).body("hello");
        })
        .await;

    let content = client(&server, Some(server.url("/files")))
        .fetch_object("vol1", "/data/a.txt")
        .await
        .unwrap();
    assert_eq!(content.content_length, Some(5));
    let body = content.body.collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_object_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/files/vol1/missing.txt");
            then.status(404);
        })
        .await;

    let err = client(&server, Some(server.url("/files")))
        .fetch_object("vol1", "missing.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::ObjectNotFound(_)));
}

#[tokio::test]
async fn test_fetch_object_without_file_server() {
    let server = MockServer::start_async().await;
    let err = client(&server, None)
        .fetch_object("vol1", "a.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::FileServerNotConfigured));
}
