//! Integration tests for `SheetsClient` using wiremock HTTP mocks.

use postsync_core::{CellUpdate, CellValue, SheetWriter};
use postsync_sheets::{SheetsClient, SheetsConfig, SheetsError};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SPREADSHEET: &str = "/v4/spreadsheets/sheet_123";

fn client(server: &MockServer, sheet_name: &str) -> SheetsClient {
    SheetsClient::new(SheetsConfig {
        api_base: server.uri(),
        spreadsheet_id: "sheet_123".to_string(),
        sheet_name: sheet_name.to_string(),
        access_token: Some("token-abc".to_string()),
        timeout_secs: 30,
    })
    .expect("client construction should not fail")
}

fn spreadsheet_meta() -> serde_json::Value {
    serde_json::json!({
        "sheets": [
            { "properties": { "sheetId": 0, "title": "Facebook" } },
            { "properties": { "sheetId": 918_273, "title": "Tiktok" } }
        ]
    })
}

#[tokio::test]
async fn read_range_returns_display_strings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{SPREADSHEET}/values/%27Tiktok%27%21A3%3AM1000")))
        .and(header("authorization", "Bearer token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "Tiktok!A3:M1000",
            "majorDimension": "ROWS",
            "values": [["1", "Title", "", "Video"], [], ["3", 42]]
        })))
        .mount(&server)
        .await;

    let rows = client(&server, "Tiktok").read_range("A3:M1000").await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["1", "Title", "", "Video"]);
    assert!(rows[1].is_empty());
    assert_eq!(rows[2], vec!["3", "42"]);
}

#[tokio::test]
async fn read_range_of_empty_tab_has_no_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "Tiktok!A3:M1000",
            "majorDimension": "ROWS"
        })))
        .mount(&server)
        .await;

    let rows = client(&server, "Tiktok").read_range("A3:M1000").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn write_cells_sends_user_entered_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{SPREADSHEET}/values:batchUpdate")))
        .and(body_partial_json(serde_json::json!({
            "valueInputOption": "USER_ENTERED",
            "data": [
                { "range": "'Tiktok'!I3", "values": [[1200]] },
                { "range": "'Tiktok'!M3", "values": [["Update 06/02"]] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let updates = vec![
        CellUpdate {
            range: "I3".to_string(),
            value: CellValue::Number(1200),
        },
        CellUpdate {
            range: "M3".to_string(),
            value: CellValue::from("Update 06/02"),
        },
    ];

    client(&server, "Tiktok").write_cells(&updates).await.unwrap();
}

#[tokio::test]
async fn append_rows_inserts_rows() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{SPREADSHEET}/values/%27Tiktok%27%21A%3AA:append")))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(body_partial_json(serde_json::json!({
            "values": [[2, "New drop", "Published"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let rows = vec![vec![
        CellValue::Number(2),
        CellValue::from("New drop"),
        CellValue::from("Published"),
    ]];

    client(&server, "Tiktok").append_rows(&rows).await.unwrap();
}

#[tokio::test]
async fn empty_writes_make_no_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let sheets = client(&server, "Tiktok");
    sheets.write_cells(&[]).await.unwrap();
    sheets.append_rows(&[]).await.unwrap();
}

#[tokio::test]
async fn sheet_id_is_resolved_by_title_and_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SPREADSHEET))
        .and(query_param("fields", "sheets.properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spreadsheet_meta()))
        .expect(1)
        .mount(&server)
        .await;

    let sheets = client(&server, "Tiktok");
    assert_eq!(sheets.resolve_sheet_id().await.unwrap(), 918_273);
    assert_eq!(sheets.resolve_sheet_id().await.unwrap(), 918_273);
}

#[tokio::test]
async fn unknown_tab_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SPREADSHEET))
        .respond_with(ResponseTemplate::new(200).set_body_json(spreadsheet_meta()))
        .mount(&server)
        .await;

    let err = client(&server, "Instagram").resolve_sheet_id().await.unwrap_err();
    assert!(matches!(err, SheetsError::SheetNotFound(name) if name == "Instagram"));
}

#[tokio::test]
async fn format_rows_posts_formatting_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SPREADSHEET))
        .respond_with(ResponseTemplate::new(200).set_body_json(spreadsheet_meta()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{SPREADSHEET}:batchUpdate")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, "Tiktok").format_rows(3, 12, (8, 11)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let format_call = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("formatting request sent");
    let body: serde_json::Value = serde_json::from_slice(&format_call.body).unwrap();
    let sent = body["requests"].as_array().unwrap();
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[0]["repeatCell"]["range"]["sheetId"], 918_273);
    assert_eq!(sent[0]["repeatCell"]["range"]["startRowIndex"], 2);
    assert_eq!(sent[0]["repeatCell"]["range"]["endRowIndex"], 12);
}

#[tokio::test]
async fn error_status_carries_operation_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
        .mount(&server)
        .await;

    let err = client(&server, "Tiktok").read_range("A3:M1000").await.unwrap_err();

    match err {
        SheetsError::Status {
            operation,
            status,
            body,
        } => {
            assert_eq!(operation, "values.get");
            assert_eq!(status, 403);
            assert_eq!(body, "PERMISSION_DENIED");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn forbidden_write_is_not_retriable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{SPREADSHEET}/values:batchUpdate")))
        .respond_with(ResponseTemplate::new(403).set_body_string("caller lacks edit access"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, "Tiktok")
        .write_cells(&[CellUpdate {
            range: "I3".to_string(),
            value: CellValue::Number(1),
        }])
        .await
        .unwrap_err();

    assert!(matches!(err, SheetsError::Status { status: 403, .. }));
    assert!(!<SheetsClient as SheetWriter>::is_retriable(&err));
}
