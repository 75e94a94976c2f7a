use pdfqa_core::chunker::{split, ChunkParams, Chunker};
use pdfqa_core::types::Document;
use pdfqa_core::Error;

fn doc(text: &str) -> Document {
    Document::new(text, "/corpus/a.pdf", Some(0))
}

fn numbered_text(len: usize) -> String {
    (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}

#[test]
fn split_is_idempotent() {
    let d = doc(&numbered_text(1000));
    let first = split(&d, 200, 50).expect("split");
    let second = split(&d, 200, 50).expect("split");
    assert_eq!(first, second);
}

#[test]
fn thousand_chars_make_seven_windows() {
    let d = doc(&numbered_text(1000));
    let chunks = split(&d, 200, 50).expect("split");
    assert_eq!(chunks.len(), 7);
    let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
    assert_eq!(offsets, vec![0, 150, 300, 450, 600, 750, 900]);
    assert_eq!(chunks.last().map(|c| c.length), Some(100), "last window is clamped, not padded");
    assert_eq!(ChunkParams::new(200, 50).expect("params").expected_chunks(1000), 7);
}

#[test]
fn consecutive_chunks_overlap_exactly() {
    let d = doc(&numbered_text(937));
    let overlap = 37;
    let chunks = split(&d, 120, overlap).expect("split");
    for pair in chunks.windows(2) {
        let tail: String = pair[0].text.chars().skip(pair[0].length - overlap).collect();
        let head: String = pair[1].text.chars().take(overlap).collect();
        assert_eq!(tail, head, "chunk {} -> {}", pair[0].index, pair[1].index);
    }
}

#[test]
fn chunks_reconstruct_the_document() {
    let text = "Grüße aus Zürich — ünïcödé text mixed with ascii. ".repeat(23);
    let d = doc(&text);
    let overlap = 11;
    let chunks = split(&d, 64, overlap).expect("split");
    let mut rebuilt = chunks[0].text.clone();
    for c in &chunks[1..] {
        rebuilt.extend(c.text.chars().skip(overlap));
    }
    assert_eq!(rebuilt, text);
    for c in &chunks {
        let expected: String = text.chars().skip(c.offset).take(c.length).collect();
        assert_eq!(c.text, expected, "offsets count characters");
        assert!(c.length > 0);
    }
}

#[test]
fn short_and_empty_documents() {
    assert_eq!(split(&doc("tiny"), 200, 50).expect("split").len(), 1);
    assert!(split(&doc(""), 200, 50).expect("split").is_empty());
    let exact = split(&doc(&numbered_text(200)), 200, 50).expect("split");
    assert_eq!(exact.len(), 1);
}

#[test]
fn chunks_keep_provenance() {
    let d = Document::new(numbered_text(500), "/corpus/b.pdf", Some(3));
    for c in split(&d, 200, 0).expect("split") {
        assert_eq!(c.source, "/corpus/b.pdf");
        assert_eq!(c.page, Some(3));
        assert_eq!(c.document_id(), d.id());
    }
}

#[test]
fn invalid_parameters_are_config_errors() {
    let d = doc("text");
    assert!(matches!(split(&d, 0, 0), Err(Error::Config(_))));
    assert!(matches!(split(&d, 100, 100), Err(Error::Config(_))));
    assert!(matches!(split(&d, 100, 150), Err(Error::Config(_))));
    assert!(ChunkParams::new(100, 99).is_ok());
}

#[test]
fn split_all_preserves_document_order() {
    let a = Document::new(numbered_text(300), "/a.pdf", Some(0));
    let b = Document::new(numbered_text(300), "/a.pdf", Some(1));
    let chunker = Chunker::new(ChunkParams::new(200, 50).expect("params"));
    let chunks = chunker.split_all([&a, &b]);
    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks.iter().map(|c| c.page).collect::<Vec<_>>(), vec![Some(0), Some(0), Some(1), Some(1)]);
}
