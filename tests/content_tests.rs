//! Content downloads, exports and thumbnails.

mod common;

use common::*;
use integrations_google_drive_storage::prelude::*;
use serde_json::json;
use std::io::Read;
use wiremock::matchers::{path, query_param};
use wiremock::ResponseTemplate;

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[tokio::test]
async fn test_binary_file_is_downloaded() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/drive/v3/files/pdf"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(drive_file("pdf", "report.pdf", "application/pdf")),
        )
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let mut content = connector
        .fetch_content(FileArgs::new("google", "pdf"))
        .await
        .unwrap();

    assert_eq!(content.name, "report.pdf");
    assert_eq!(content.content_type, "application/pdf");
    let mut body = Vec::new();
    content.data.read_to_end(&mut body).unwrap();
    assert_eq!(body, b"%PDF-1.7");
}

#[tokio::test]
async fn test_native_document_is_exported() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/drive/v3/files/doc/export"))
        .and(query_param("mimeType", DOCX))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_file(
            "doc",
            "Plan",
            "application/vnd.google-apps.document",
        )))
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let content = connector
        .fetch_content(FileArgs::new("google", "doc"))
        .await
        .unwrap();

    assert_eq!(content.name, "Plan.docx");
    assert_eq!(content.content_type, DOCX);
    assert_eq!(content.len(), 4);
}

#[tokio::test]
async fn test_shortcut_downloads_its_target() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/drive/v3/files/target"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"target bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/short"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "short",
            "name": "notes.txt",
            "mimeType": "application/vnd.google-apps.shortcut",
            "shortcutDetails": {"targetId": "target", "targetMimeType": "text/plain"}
        })))
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let content = connector
        .fetch_content(FileArgs::new("google", "short"))
        .await
        .unwrap();

    assert_eq!(content.content_type, "text/plain");
    assert_eq!(content.data.get_ref().as_ref(), b"target bytes");
}

#[tokio::test]
async fn test_types_without_content_are_unavailable() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/drive/v3/files/form"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_file(
            "form",
            "Survey",
            "application/vnd.google-apps.form",
        )))
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/dir"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_folder("dir", "Dir", &[])))
        .mount(&server)
        .await;

    let connector = connector(&server).await;

    let error = connector
        .fetch_content(FileArgs::new("google", "form"))
        .await
        .unwrap_err();
    assert_eq!(
        error.unavailable_reason(),
        Some(&UnavailableReason::NoExportTarget(
            "application/vnd.google-apps.form".to_string()
        ))
    );

    let error = connector
        .fetch_content(FileArgs::new("google", "dir"))
        .await
        .unwrap_err();
    assert!(error.is_unavailable());
}

#[tokio::test]
async fn test_failed_download_is_a_remote_error() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/drive/v3/files/big"))
        .and(query_param("alt", "media"))
        .respond_with(drive_error(503, "backendError", "Service unavailable"))
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/big"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(drive_file("big", "big.iso", "application/x-iso9660-image")),
        )
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let error = connector
        .fetch_content(FileArgs::new("google", "big"))
        .await
        .unwrap_err();
    assert!(matches!(error, ConnectorError::Remote(_)));
}

#[tokio::test]
async fn test_thumbnail_is_fetched_with_credentials() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/thumbnails/img"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(b"\x89PNG".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/img"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "img",
            "name": "photo.jpg",
            "mimeType": "image/jpeg",
            "thumbnailLink": format!("{}/thumbnails/img", server.uri())
        })))
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let thumbnail = connector
        .fetch_thumbnail(FileArgs::new("google", "img"))
        .await
        .unwrap();

    assert_eq!(thumbnail.content_type, "image/png");
    assert_eq!(thumbnail.len(), 4);
}

#[tokio::test]
async fn test_shortcut_thumbnail_comes_from_its_target() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/thumbnails/target"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(b"\xFF\xD8".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/short"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "short",
            "name": "photo link",
            "mimeType": "application/vnd.google-apps.shortcut",
            "shortcutDetails": {"targetId": "target", "targetMimeType": "image/jpeg"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    authorized("GET")
        .and(path("/drive/v3/files/target"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "target",
            "name": "photo.jpg",
            "mimeType": "image/jpeg",
            "thumbnailLink": format!("{}/thumbnails/target", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let thumbnail = connector
        .fetch_thumbnail(FileArgs::new("google", "short"))
        .await
        .unwrap();

    assert_eq!(thumbnail.content_type, "image/jpeg");
    assert_eq!(thumbnail.len(), 2);
}

#[tokio::test]
async fn test_missing_thumbnail_is_a_remote_error() {
    let server = setup_mock_server().await;
    authorized("GET")
        .and(path("/drive/v3/files/txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(drive_file("txt", "a.txt", "text/plain")),
        )
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let error = connector
        .fetch_thumbnail(FileArgs::new("google", "txt"))
        .await
        .unwrap_err();

    let ConnectorError::Remote(remote) = error else {
        panic!("expected a remote error");
    };
    assert!(remote.is_not_found());
}
