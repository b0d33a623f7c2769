//! Integration tests for remote sources served from a local listener.

use pdfmerge::config::PipelineConfig;
use pdfmerge::error::FailureKind;
use pdfmerge::io::Upload;
use pdfmerge::pipeline::MergeRequest;
use reqwest::StatusCode;

use crate::common::{PdfBuilder, TestPipeline, page_widths, serve};

#[tokio::test]
async fn test_three_page_url_is_merged_and_temp_storage_removed() {
    let (base, server) = serve(vec![("/doc.pdf", PdfBuilder::new(3, 300.0).build())]).await;
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .url(format!("{base}/doc.pdf"))
        .build()
        .unwrap();

    let outcome = h.pipeline.run(request).await;

    assert_eq!(outcome.status(), StatusCode::OK);
    assert_eq!(page_widths(outcome.body()), vec![300.0, 300.0, 300.0]);
    assert_eq!(h.leftover_files(), 0);
    server.abort();
}

#[tokio::test]
async fn test_uploads_come_before_urls() {
    let (base, server) = serve(vec![("/remote.pdf", PdfBuilder::new(1, 300.0).build())]).await;
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .url(format!("{base}/remote.pdf"))
        .upload(Upload::from_bytes("local.pdf", PdfBuilder::new(1, 100.0).build()))
        .build()
        .unwrap();

    let (bytes, _) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(page_widths(&bytes), vec![100.0, 300.0]);
    server.abort();
}

#[tokio::test]
async fn test_missing_remote_document_is_download_error() {
    let (base, server) = serve(vec![("/doc.pdf", PdfBuilder::new(1, 100.0).build())]).await;
    let h = TestPipeline::new();
    let url = format!("{base}/missing.pdf");
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(1, 100.0).build()))
        .url(format!("{base}/doc.pdf"))
        .url(&url)
        .build()
        .unwrap();

    let err = h.pipeline.execute(request).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Download);
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains(&url));
    assert_eq!(h.leftover_files(), 0);
    server.abort();
}

#[tokio::test]
async fn test_zero_page_download_names_the_url() {
    let (base, server) = serve(vec![("/blank.pdf", PdfBuilder::new(0, 100.0).build())]).await;
    let h = TestPipeline::new();
    let url = format!("{base}/blank.pdf");
    let request = MergeRequest::builder().url(&url).build().unwrap();

    let err = h.pipeline.execute(request).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(
        err.to_string(),
        format!("Downloaded PDF has no pages from URL: {url}")
    );
    assert_eq!(h.leftover_files(), 0);
    server.abort();
}

#[tokio::test]
async fn test_zero_page_url_reported_before_later_failing_url() {
    let (base, server) = serve(vec![("/blank.pdf", PdfBuilder::new(0, 100.0).build())]).await;
    let h = TestPipeline::with_config(PipelineConfig {
        download_concurrency: 2,
        ..PipelineConfig::default()
    });
    let blank = format!("{base}/blank.pdf");
    let request = MergeRequest::builder()
        .url(&blank)
        .url(format!("{base}/missing.pdf"))
        .build()
        .unwrap();

    let err = h.pipeline.execute(request).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(
        err.to_string(),
        format!("Downloaded PDF has no pages from URL: {blank}")
    );
    assert_eq!(h.leftover_files(), 0);
    server.abort();
}

#[tokio::test]
async fn test_concurrent_downloads_keep_input_order() {
    let (base, server) = serve(vec![
        ("/1.pdf", PdfBuilder::new(1, 100.0).build()),
        ("/2.pdf", PdfBuilder::new(2, 200.0).build()),
        ("/3.pdf", PdfBuilder::new(1, 300.0).build()),
        ("/4.pdf", PdfBuilder::new(1, 400.0).build()),
    ])
    .await;
    let h = TestPipeline::with_config(PipelineConfig {
        download_concurrency: 4,
        ..PipelineConfig::default()
    });
    let request = MergeRequest::builder()
        .urls((1..=4).map(|i| format!("{base}/{i}.pdf")))
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(stats.sources_merged, 4);
    assert_eq!(page_widths(&bytes), vec![100.0, 200.0, 200.0, 300.0, 400.0]);
    assert_eq!(h.leftover_files(), 0);
    server.abort();
}
