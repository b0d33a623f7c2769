//! Integration tests for merging uploads.

use pdfmerge::io::Upload;
use pdfmerge::merge::OrderingMode;
use pdfmerge::pipeline::MergeRequest;
use reqwest::StatusCode;
use rstest::rstest;

use crate::common::{PdfBuilder, TestPipeline, page_widths};

#[tokio::test]
async fn test_two_uploads_in_provided_order() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(1, 100.0).build()))
        .upload(Upload::from_bytes("b.pdf", PdfBuilder::new(2, 200.0).build()))
        .sort_type("orderProvided")
        .build()
        .unwrap();

    let outcome = h.pipeline.run(request).await;

    assert_eq!(outcome.status(), StatusCode::OK);
    assert_eq!(outcome.content_type(), "application/pdf");
    assert_eq!(outcome.filename(), Some("merged.pdf"));
    assert_eq!(page_widths(outcome.body()), vec![100.0, 200.0, 200.0]);
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn test_by_file_name_reorders_uploads() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("b.pdf", PdfBuilder::new(1, 200.0).build()))
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(1, 100.0).build()))
        .sort_type("byFileName")
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(page_widths(&bytes), vec![100.0, 200.0]);
    assert_eq!(stats.sources_merged, 2);
    assert_eq!(stats.total_pages, 2);
    assert_eq!(h.leftover_files(), 0);
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(8)]
#[tokio::test]
async fn test_n_single_page_sources_keep_input_order(#[case] n: usize) {
    let h = TestPipeline::new();
    let uploads = (0..n).map(|i| {
        let width = 100.0 + i as f32;
        Upload::from_bytes(format!("{}.pdf", n - i), PdfBuilder::new(1, width).build())
    });
    let request = MergeRequest::builder()
        .uploads(uploads)
        .ordering_mode(OrderingMode::AsProvided)
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    let expected: Vec<f32> = (0..n).map(|i| 100.0 + i as f32).collect();
    assert_eq!(page_widths(&bytes), expected);
    assert_eq!(stats.total_pages, n);
}

#[tokio::test]
async fn test_by_title_orders_untitled_first() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes(
            "1.pdf",
            PdfBuilder::new(1, 100.0).title("Zulu").build(),
        ))
        .upload(Upload::from_bytes("2.pdf", PdfBuilder::new(1, 200.0).build()))
        .upload(Upload::from_bytes(
            "3.pdf",
            PdfBuilder::new(1, 300.0).title("Alpha").build(),
        ))
        .sort_type("byPDFTitle")
        .build()
        .unwrap();

    let (bytes, _) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(page_widths(&bytes), vec![200.0, 300.0, 100.0]);
}

#[rstest]
#[case("byDateCreated")]
#[case("byDateModified")]
#[tokio::test]
async fn test_file_time_order_follows_persist_order(#[case] token: &str) {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("z.pdf", PdfBuilder::new(1, 100.0).build()))
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(1, 200.0).build()))
        .upload(Upload::from_bytes("m.pdf", PdfBuilder::new(1, 300.0).build()))
        .sort_type(token)
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    // Temp files are written in input order; ties keep the input order too.
    assert_eq!(page_widths(&bytes), vec![100.0, 200.0, 300.0]);
    assert_eq!(stats.sources_merged, 3);
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn test_multi_page_sources_keep_intra_document_order() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(4, 150.0).build()))
        .upload(Upload::from_bytes("b.pdf", PdfBuilder::new(3, 250.0).build()))
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(stats.total_pages, 7);
    assert_eq!(
        page_widths(&bytes),
        vec![150.0, 150.0, 150.0, 150.0, 250.0, 250.0, 250.0]
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_a_pipeline() {
    let h = TestPipeline::new();
    let request = |width: f32| {
        MergeRequest::builder()
            .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(1, width).build()))
            .upload(Upload::from_bytes("b.pdf", PdfBuilder::new(1, width + 1.0).build()))
            .build()
            .unwrap()
    };

    let (first, second) = tokio::join!(
        h.pipeline.execute(request(100.0)),
        h.pipeline.execute(request(300.0))
    );

    assert_eq!(page_widths(&first.unwrap().0), vec![100.0, 101.0]);
    assert_eq!(page_widths(&second.unwrap().0), vec![300.0, 301.0]);
    assert_eq!(h.leftover_files(), 0);
}
