//! HTTP endpoint tests using axum-test

use std::sync::Arc;

use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use pdfcompare_core::CompareConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::{build_router, AppState};

const LEASE: &str = "The tenant shall pay rent on the first day of each month to the landlord.";
const LEASE_REVISED: &str =
    "The tenant shall pay rent on the fifth day of each month to the landlord.";

fn create_test_server() -> TestServer {
    let state = AppState {
        timeout_ms: 10000,
        config: Arc::new(CompareConfig::default()),
    };
    TestServer::new(build_router(state, 10 * 1024 * 1024)).unwrap()
}

/// One-page PDF per entry: `Some(text)` shows text, `None` paints an image
fn build_pdf(pages: &[Option<&str>], size: (i64, i64)) -> String {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0u8],
    ));

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
            None => vec![Operation::new("Do", vec!["Im1".into()])],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), size.0.into(), size.1.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    STANDARD.encode(bytes)
}

fn letter(pages: &[Option<&str>]) -> String {
    build_pdf(pages, (612, 792))
}

#[tokio::test]
async fn test_health_returns_200() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "pdfcompare-server");
}

#[tokio::test]
async fn test_analyze_text_pdf() {
    let server = create_test_server();
    let response = server
        .post("/api/analyze")
        .json(&json!({
            "fileName": "lease.pdf",
            "data": letter(&[Some(LEASE), None]),
        }))
        .await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert!(json["success"].as_bool().unwrap());
    assert_eq!(json["fileName"], "lease.pdf");
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["textBasedPages"], 1);
    // 1 of 2 is not a strict majority
    assert_eq!(json["fileType"], "image-based");
    assert_eq!(json["confidence"], 50);
}

#[tokio::test]
async fn test_analyze_with_threshold_override() {
    let server = create_test_server();
    let response = server
        .post("/api/analyze")
        .json(&json!({
            "fileName": "short.pdf",
            "data": letter(&[Some("Short page.")]),
            "config": { "textPageThreshold": 5 },
        }))
        .await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["fileType"], "text-based");
}

#[tokio::test]
async fn test_compare_revised_lease() {
    let server = create_test_server();
    let response = server
        .post("/api/compare")
        .json(&json!({
            "left": { "fileName": "v1.pdf", "data": letter(&[Some(LEASE)]) },
            "right": { "fileName": "v2.pdf", "data": letter(&[Some(LEASE_REVISED)]) },
        }))
        .await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert!(json["success"].as_bool().unwrap());
    assert!(json.get("requiresOCR").is_none());
    assert_eq!(json["changes"]["added"], 1);
    assert_eq!(json["changes"]["removed"], 1);
    let overall = json["similarity"]["overall"].as_u64().unwrap();
    assert!(overall > 80 && overall < 100, "overall = {}", overall);
    assert_eq!(json["fileTypes"]["left"], "text-based");
}

#[tokio::test]
async fn test_compare_scanned_requires_ocr() {
    let server = create_test_server();
    let response = server
        .post("/api/compare")
        .json(&json!({
            "left": { "fileName": "v1.pdf", "data": letter(&[Some(LEASE)]) },
            "right": { "fileName": "scan.pdf", "data": letter(&[None, None]) },
        }))
        .await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["requiresOCR"], true);
    assert_eq!(json["leftIsImageBased"], false);
    assert_eq!(json["rightIsImageBased"], true);
    assert!(json.get("similarity").is_none());
}

#[tokio::test]
async fn test_compare_rejects_bad_base64() {
    let server = create_test_server();
    let response = server
        .post("/api/compare")
        .json(&json!({
            "left": { "fileName": "v1.pdf", "data": "not base64!" },
            "right": { "fileName": "v2.pdf", "data": letter(&[Some(LEASE)]) },
        }))
        .await;
    response.assert_status_bad_request();

    let json = response.json::<Value>();
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_compare_rejects_non_pdf() {
    let server = create_test_server();
    let response = server
        .post("/api/compare")
        .json(&json!({
            "left": { "fileName": "notes.txt", "data": STANDARD.encode("plain text, not a pdf") },
            "right": { "fileName": "v2.pdf", "data": letter(&[Some(LEASE)]) },
        }))
        .await;
    response.assert_status_bad_request();

    let json = response.json::<Value>();
    assert_eq!(json["code"], "PARSE_ERROR");
    assert!(json["error"].as_str().unwrap().contains("notes.txt"));
}

#[tokio::test]
async fn test_encrypted_pdf_returns_422() {
    let server = create_test_server();
    let encrypted = STANDARD.encode("%PDF-1.7\n1 0 obj << /Filter /Standard >> endobj\ntrailer << /Encrypt 1 0 R >>");
    let response = server
        .post("/api/analyze")
        .json(&json!({ "fileName": "locked.pdf", "data": encrypted }))
        .await;

    assert_eq!(response.status_code().as_u16(), 422);
    let json = response.json::<Value>();
    assert_eq!(json["code"], "PASSWORD_REQUIRED");
}

#[tokio::test]
async fn test_overlay_pages() {
    let server = create_test_server();
    let response = server
        .post("/api/overlay")
        .json(&json!({
            "downLayer": { "fileName": "v1.pdf", "data": letter(&[Some(LEASE)]), "page": 1 },
            "upLayer": { "fileName": "a4.pdf", "data": build_pdf(&[Some(LEASE)], (595, 842)) },
            "settings": { "opacity": 75 },
        }))
        .await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    let differences = &json["differences"];
    assert_eq!(differences["dimensionMatch"]["perfectMatch"], false);
    assert_eq!(differences["textDifferences"]["textSimilarity"], 100);
    assert_eq!(differences["similarityScore"], 91);
    assert_eq!(json["overlaySettings"]["opacity"], 75);
    assert_eq!(json["overlaySettings"]["blendMode"], "difference");
}

#[tokio::test]
async fn test_overlay_page_out_of_range() {
    let server = create_test_server();
    let response = server
        .post("/api/overlay")
        .json(&json!({
            "downLayer": { "fileName": "v1.pdf", "data": letter(&[Some(LEASE)]), "page": 4 },
            "upLayer": { "fileName": "v2.pdf", "data": letter(&[Some(LEASE)]) },
        }))
        .await;
    response.assert_status_bad_request();

    let json = response.json::<Value>();
    assert_eq!(json["code"], "PAGE_OUT_OF_RANGE");
}
