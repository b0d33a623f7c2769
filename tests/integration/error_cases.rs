//! Integration tests for rejected requests.

use pdfmerge::error::FailureKind;
use pdfmerge::io::Upload;
use pdfmerge::pipeline::{MergeRequest, NO_SOURCES_MESSAGE};
use pdfmerge::report::{MergeOutcome, TEXT_CONTENT_TYPE};
use reqwest::StatusCode;
use rstest::rstest;

use crate::common::{PdfBuilder, TestPipeline};

fn failure_kind(outcome: &MergeOutcome) -> Option<FailureKind> {
    match outcome {
        MergeOutcome::Failure { kind, .. } => Some(*kind),
        MergeOutcome::Success { .. } => None,
    }
}

#[tokio::test]
async fn test_zero_page_upload_is_rejected() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("good.pdf", PdfBuilder::new(2, 100.0).build()))
        .upload(Upload::from_bytes("empty.pdf", PdfBuilder::new(0, 100.0).build()))
        .build()
        .unwrap();

    let outcome = h.pipeline.run(request).await;

    assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    assert_eq!(outcome.content_type(), TEXT_CONTENT_TYPE);
    assert_eq!(failure_kind(&outcome), Some(FailureKind::Validation));
    assert_eq!(outcome.body(), b"File empty.pdf contains no pages");
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn test_zero_page_upload_reported_before_unreachable_url() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = format!("http://{}/gone.pdf", listener.local_addr().unwrap());
    drop(listener);

    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("empty.pdf", PdfBuilder::new(0, 100.0).build()))
        .url(&closed)
        .build()
        .unwrap();

    let err = h.pipeline.execute(request).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(err.to_string(), "File empty.pdf contains no pages");
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn test_no_sources() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder().build().unwrap();

    let outcome = h.pipeline.run(request).await;

    assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    assert_eq!(outcome.body(), NO_SOURCES_MESSAGE.as_bytes());
}

#[tokio::test]
async fn test_only_blank_inputs_count_as_no_sources() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("", Vec::new()))
        .urls(["", "   "])
        .build()
        .unwrap();

    let err = h.pipeline.execute(request).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(err.to_string(), NO_SOURCES_MESSAGE);
}

#[tokio::test]
async fn test_garbage_upload_is_io_error() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("notes.pdf", b"just some text".to_vec()))
        .build()
        .unwrap();

    let outcome = h.pipeline.run(request).await;

    assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failure_kind(&outcome), Some(FailureKind::Io));
    let body = String::from_utf8(outcome.into_body()).unwrap();
    assert!(body.starts_with("I/O error: "), "unexpected body: {body}");
    assert!(body.contains("notes.pdf"));
    assert_eq!(h.leftover_files(), 0);
}

#[rstest]
#[case("bySize")]
#[case("BYFILENAME")]
#[case("")]
fn test_unknown_sort_type_is_validation_error(#[case] token: &str) {
    let err = MergeRequest::builder()
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(1, 100.0).build()))
        .sort_type(token)
        .build()
        .unwrap_err();

    let outcome = MergeOutcome::failure(&err);
    assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    assert_eq!(failure_kind(&outcome), Some(FailureKind::Validation));
}

#[rstest]
#[case("ftp://example.com/a.pdf")]
#[case("example.com/a.pdf")]
#[case("http://")]
#[tokio::test]
async fn test_invalid_url_is_download_error(#[case] url: &str) {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(1, 100.0).build()))
        .url(url)
        .build()
        .unwrap();

    let outcome = h.pipeline.run(request).await;

    assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    assert_eq!(failure_kind(&outcome), Some(FailureKind::Download));
    let body = String::from_utf8(outcome.body().to_vec()).unwrap();
    assert!(body.contains(url), "body should name the URL: {body}");
    assert_eq!(h.leftover_files(), 0);
}
