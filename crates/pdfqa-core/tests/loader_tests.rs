use std::fs;
use std::path::Path;
use std::sync::Arc;

use pdfqa_core::loader::{normalize_page_text, LoadReport, PdfLoader, PdfPageExtractor};
use pdfqa_core::types::Document;
use pdfqa_core::DocumentParseError;
use pdfqa_core::traits::PageExtractor;
use pdfqa_core::Error;
use tempfile::TempDir;

/// Treats `.pdf` files as UTF-8 text with form feeds between pages.
struct TextPages;

impl PageExtractor for TextPages {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        let raw = fs::read_to_string(path)?;
        if raw.starts_with("%CORRUPT") {
            anyhow::bail!("bad xref table");
        }
        Ok(raw.split('\u{c}').map(str::to_string).collect())
    }
}

fn loader(dir: &Path) -> PdfLoader {
    PdfLoader::new(dir, Arc::new(TextPages))
}

#[test]
fn missing_directory_is_ingest_error() {
    let tmp = TempDir::new().unwrap();
    let err = loader(&tmp.path().join("nope")).load().unwrap_err();
    assert!(matches!(err, Error::Ingest(_)));
}

#[test]
fn directory_without_pdfs_is_ingest_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.txt"), "not a pdf").unwrap();
    assert!(matches!(loader(tmp.path()).discover(), Err(Error::Ingest(_))));
}

#[test]
fn documents_are_sorted_by_path_then_page() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("sub")).unwrap();
    fs::write(tmp.path().join("b.pdf"), "b0\u{c}b1").unwrap();
    fs::write(tmp.path().join("a.PDF"), "a0").unwrap();
    fs::write(tmp.path().join("sub/c.pdf"), "c0\u{c}\u{c}c2").unwrap();

    let report = loader(tmp.path()).load().expect("load");
    let seen: Vec<(String, Option<usize>)> = report
        .documents
        .iter()
        .map(|d| (d.text.clone(), d.page))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("a0".to_string(), Some(0)),
            ("b0".to_string(), Some(0)),
            ("b1".to_string(), Some(1)),
            ("c0".to_string(), Some(0)),
            ("c2".to_string(), Some(2)),
        ],
        "blank pages are skipped but keep their page index"
    );
    assert_eq!(report.files_loaded, 3);
    assert!(report.failures.is_empty());
}

#[test]
fn corrupt_file_is_recorded_and_skipped() {
    let tmp = TempDir::new().unwrap();
    for name in ["a.pdf", "b.pdf", "d.pdf", "e.pdf"] {
        fs::write(tmp.path().join(name), format!("contents of {name}")).unwrap();
    }
    fs::write(tmp.path().join("c.pdf"), "%CORRUPT").unwrap();

    let report = loader(tmp.path()).load().expect("load");
    assert_eq!(report.files_loaded, 4);
    assert_eq!(report.documents.len(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, tmp.path().join("c.pdf"));
    assert!(report.failures[0].reason.contains("bad xref"));
}

#[test]
fn lazy_iterator_yields_errors_inline() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.pdf"), "%CORRUPT").unwrap();
    fs::write(tmp.path().join("b.pdf"), "one\u{c}two").unwrap();

    let items: Vec<_> = loader(tmp.path()).documents().expect("documents").collect();
    assert_eq!(items.len(), 3);
    assert!(items[0].is_err());
    assert_eq!(items[2].as_ref().map(|d| d.text.as_str()), Ok("two"));
}

#[test]
fn real_extractor_rejects_garbage() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.pdf");
    fs::write(&path, b"this is not a pdf at all").unwrap();
    assert!(PdfPageExtractor.extract_pages(&path).is_err());

    let report = PdfLoader::pdf(tmp.path()).load().expect("load");
    assert!(report.documents.is_empty());
    assert_eq!(report.failures.len(), 1);
}

/// Minimal uncompressed PDF with one Helvetica text line per page.
fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let n = pages.len();
    let kids = (0..n).map(|i| format!("{} 0 R", 4 + 2 * i)).collect::<Vec<_>>().join(" ");
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {n} >>"),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        let content = format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n", objects.len() + 1).as_bytes(),
    );
    out
}

#[test]
fn real_extractor_reads_pages_in_order() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("atlas.pdf"), text_pdf(&["Alpha page one", "Zanzibar page two"])).unwrap();

    let report = PdfLoader::pdf(tmp.path()).load().expect("load");
    assert!(report.failures.is_empty());
    assert_eq!(report.files_loaded, 1);
    let pages: Vec<(Option<usize>, &str)> = report.documents.iter().map(|d| (d.page, d.text.as_str())).collect();
    assert_eq!(pages, vec![(Some(0), "Alpha page one"), (Some(1), "Zanzibar page two")]);
    assert!(report.documents.iter().all(|d| d.source.ends_with("atlas.pdf")));
}

#[test]
fn report_records_outcomes_in_order() {
    let mut report = LoadReport::default();
    report.record(Ok(vec![Document::new("one", "a.pdf", Some(0)), Document::new("two", "a.pdf", Some(1))]));
    report.record(Err(DocumentParseError::new("b.pdf", "bad xref table")));
    report.record(Ok(Vec::new()));

    assert_eq!(report.files_loaded, 2);
    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.documents[1].text, "two");
    assert_eq!(report.failures, vec![DocumentParseError::new("b.pdf", "bad xref table")]);
}

#[test]
fn normalization_collapses_whitespace() {
    let raw = "  Title\r\n\r\n\r\nfirst   line\t here\u{0}\nsecond line  \n\n";
    assert_eq!(normalize_page_text(raw), "Title\n\nfirst line here\nsecond line");
    assert_eq!(normalize_page_text(" \n\t\n"), "");
}
