//! Integration tests for carrying and stripping form fields.

use pdfmerge::io::Upload;
use pdfmerge::pipeline::MergeRequest;

use crate::common::{PdfBuilder, TestPipeline, form_fields, page_widths};

fn signed_source() -> Vec<u8> {
    PdfBuilder::new(1, 100.0)
        .signature("approval")
        .signature("witness")
        .text_field("comments")
        .build()
}

#[tokio::test]
async fn test_strip_removes_signatures_and_keeps_other_fields() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("signed.pdf", signed_source()))
        .upload(Upload::from_bytes("plain.pdf", PdfBuilder::new(1, 200.0).build()))
        .strip_signatures(true)
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(stats.signatures_removed, 2);
    assert!(!stats.form_detached);
    let fields = form_fields(&bytes).expect("form kept");
    assert_eq!(fields, vec![("comments".to_string(), "Tx".to_string())]);
    assert_eq!(page_widths(&bytes), vec![100.0, 200.0]);
}

#[tokio::test]
async fn test_fields_are_carried_without_stripping() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("signed.pdf", signed_source()))
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(stats.signatures_removed, 0);
    let kinds: Vec<_> = form_fields(&bytes)
        .expect("form carried")
        .into_iter()
        .map(|(_, kind)| kind)
        .collect();
    assert_eq!(kinds, vec!["Sig", "Sig", "Tx"]);
}

#[tokio::test]
async fn test_only_signatures_detaches_form() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes(
            "a.pdf",
            PdfBuilder::new(1, 100.0).signature("s1").build(),
        ))
        .upload(Upload::from_bytes(
            "b.pdf",
            PdfBuilder::new(1, 200.0).signature("s2").build(),
        ))
        .strip_signatures(true)
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(stats.signatures_removed, 2);
    assert!(stats.form_detached);
    assert_eq!(form_fields(&bytes), None);
}

#[tokio::test]
async fn test_strip_detaches_empty_form() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes(
            "blank-form.pdf",
            PdfBuilder::new(1, 100.0).empty_form().build(),
        ))
        .strip_signatures(true)
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(stats.signatures_removed, 0);
    assert!(stats.form_detached);
    assert_eq!(form_fields(&bytes), None);
    assert_eq!(page_widths(&bytes), vec![100.0]);
}

#[tokio::test]
async fn test_empty_form_is_carried_without_stripping() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes(
            "blank-form.pdf",
            PdfBuilder::new(1, 100.0).empty_form().build(),
        ))
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert!(!stats.form_detached);
    assert_eq!(form_fields(&bytes), Some(Vec::new()));
}

#[tokio::test]
async fn test_strip_without_form_is_noop() {
    let h = TestPipeline::new();
    let request = MergeRequest::builder()
        .upload(Upload::from_bytes("a.pdf", PdfBuilder::new(2, 100.0).build()))
        .strip_signatures(true)
        .build()
        .unwrap();

    let (bytes, stats) = h.pipeline.execute(request).await.unwrap();

    assert_eq!(stats.signatures_removed, 0);
    assert!(!stats.form_detached);
    assert_eq!(form_fields(&bytes), None);
    assert_eq!(h.leftover_files(), 0);
}
