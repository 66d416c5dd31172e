//! Property tests for chunk size bounds and lossless reassembly.

use proptest::prelude::*;
use ragline::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use ragline::document::{Chunk, Document};

/// Text mixing words, sentence ends, line and paragraph breaks, and
/// multi-byte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zé]{1,9}",
            3 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
        ],
        0..120,
    )
    .prop_map(|parts| parts.concat())
}

/// Chunk size with an overlap strictly smaller than it.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..60).prop_flat_map(|size| (Just(size), 0..size))
}

/// Concatenate chunks, dropping the overlapping prefix of every chunk after the first.
fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.text);
        } else {
            out.extend(chunk.text.chars().skip(overlap));
        }
    }
    out
}

mod prop_recursive_chunker {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_fit_and_reassemble_exactly(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let doc = Document::new("doc", text.clone());
            let chunks = RecursiveChunker::new(size, overlap).unwrap().chunk(&doc);

            prop_assert_eq!(chunks.is_empty(), text.is_empty());
            for chunk in &chunks {
                let len = chunk.text.chars().count();
                prop_assert!(len <= size, "chunk of {} chars exceeds {}", len, size);
                prop_assert!(len > 0);
            }
            prop_assert_eq!(reassemble(&chunks, overlap), text);
        }

        #[test]
        fn offsets_and_ids_follow_chunk_order(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let doc = Document::new("doc", text);
            let chunks = RecursiveChunker::new(size, overlap).unwrap().chunk(&doc);

            let mut last_offset: Option<usize> = None;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(&chunk.id, &format!("doc_{i}"));
                prop_assert_eq!(&chunk.document_id, "doc");
                let offset: usize = chunk.metadata["start_offset"].parse().unwrap();
                if let Some(last) = last_offset {
                    prop_assert!(offset > last, "chunk starts must strictly advance");
                }
                last_offset = Some(offset);
            }
        }
    }
}

mod prop_fixed_size_chunker {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn every_chunk_but_the_last_is_full(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let doc = Document::new("doc", text.clone());
            let chunks = FixedSizeChunker::new(size, overlap).unwrap().chunk(&doc);

            if let Some((_, init)) = chunks.split_last() {
                for chunk in init {
                    prop_assert_eq!(chunk.text.chars().count(), size);
                }
            }
            prop_assert_eq!(reassemble(&chunks, overlap), text);
        }
    }
}

#[test]
fn four_char_windows_break_between_words() {
    let doc = Document::new("doc", "A B C D");
    let chunks = RecursiveChunker::new(4, 1).unwrap().chunk(&doc);
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["A B ", " C D"]);
    assert!(texts[0].ends_with(' ') && texts[1].starts_with(' '));
}
