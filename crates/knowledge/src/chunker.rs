//! Text chunking with configurable size and overlap.
//!
//! Lengths are counted in `char`s. Each chunk is cut at the last separator
//! inside its window, trying paragraph breaks first, then line breaks,
//! sentence ends and spaces, and finally a hard character boundary. The next
//! chunk starts `overlap` characters before the previous cut, so adjacent
//! chunks share that many characters verbatim.

use crate::types::{Chunk, Document};
use manualqa_core::{AppError, AppResult};

/// Separators in priority order. Cuts land just after the separator.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub overlap: usize,

    /// Cut at `chunk_size` when a window holds no separator. When false, the
    /// chunk runs on to the next separator and may exceed `chunk_size`.
    pub hard_split: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            overlap: 1_000,
            hard_split: true,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        let config = Self {
            chunk_size,
            overlap,
            hard_split: true,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk size must be greater than 0".to_string()));
        }
        if self.overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Split `text` into overlapping pieces.
///
/// Returns an empty vector for empty text. No piece is whitespace only: a
/// blank stretch is folded into the chunk that follows it, and a blank run
/// longer than a whole chunk is skipped. An out-of-range overlap is clamped
/// so the split always terminates.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let size = config.chunk_size.max(1);
    let overlap = config.overlap.min(size - 1);

    // Byte offset of every char, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut pieces = Vec::new();
    let mut start = 0usize;
    // Char index where the last emitted piece ends.
    let mut prev_end: Option<usize> = None;

    loop {
        let Some(content) = first_content(text, &bounds, start) else {
            break;
        };

        if content >= start + size {
            start = match prev_end {
                Some(end) => {
                    resume_after_blank_run(text, &bounds, start, end, content, size, overlap)
                }
                None => content,
            };
            continue;
        }

        if total - start <= size {
            push_piece(&mut pieces, &text[bounds[start]..]);
            break;
        }

        // A cut at or before the first non-blank char would leave a blank piece.
        let min_cut = (start + overlap).max(content);
        let cut = match find_cut(text, &bounds, start, size, min_cut) {
            Some(cut) => cut,
            None if config.hard_split => start + size,
            None => match find_soft_cut(text, &bounds, start, min_cut) {
                Some(cut) if cut < total => cut,
                _ => {
                    push_piece(&mut pieces, &text[bounds[start]..]);
                    break;
                }
            },
        };

        push_piece(&mut pieces, &text[bounds[start]..bounds[cut]]);
        prev_end = Some(cut);
        start = cut - overlap;
    }

    pieces
}

fn push_piece(pieces: &mut Vec<String>, piece: &str) {
    if !piece.trim().is_empty() {
        pieces.push(piece.to_string());
    }
}

/// Char index of the first non-whitespace char at or after `start`.
fn first_content(text: &str, bounds: &[usize], start: usize) -> Option<usize> {
    let from = bounds[start];
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .and_then(|(i, _)| char_index(bounds, from + i))
}

/// Start of the chunk after a blank run that fills a whole window.
///
/// The chunk must reach `content`, so it cannot begin at `start`. Inside the
/// run, pick the latest position that repeats the longest possible tail of
/// the previous piece (ending at `prev_end`), keeping the two chunks joined.
fn resume_after_blank_run(
    text: &str,
    bounds: &[usize],
    start: usize,
    prev_end: usize,
    content: usize,
    size: usize,
    overlap: usize,
) -> usize {
    let lowest = (content + 1 - size).max(start + 1);

    for len in (1..=overlap).rev() {
        let tail = &text[bounds[prev_end - len]..bounds[prev_end]];
        let found = (lowest..=content - len)
            .rev()
            .find(|&pos| &text[bounds[pos]..bounds[pos + len]] == tail);
        if let Some(pos) = found {
            return pos;
        }
    }

    content - overlap
}

/// Char index just past the best separator inside `[start, start + size)`.
///
/// Only cuts beyond `min_cut` qualify, so the next window always moves
/// forward and the piece holds some content.
fn find_cut(
    text: &str,
    bounds: &[usize],
    start: usize,
    size: usize,
    min_cut: usize,
) -> Option<usize> {
    let window_start = bounds[start];
    let window = &text[window_start..bounds[start + size]];

    SEPARATORS.iter().find_map(|sep| {
        let found = window.rfind(sep)?;
        let cut = char_index(bounds, window_start + found + sep.len())?;
        (cut > min_cut).then_some(cut)
    })
}

/// Earliest separator end past `min_cut`, anywhere after `start`.
fn find_soft_cut(text: &str, bounds: &[usize], start: usize, min_cut: usize) -> Option<usize> {
    let rest_start = bounds[start];
    let rest = &text[rest_start..];

    SEPARATORS
        .iter()
        .filter_map(|sep| {
            rest.match_indices(sep)
                .filter_map(|(found, _)| char_index(bounds, rest_start + found + sep.len()))
                .find(|cut| *cut > min_cut)
        })
        .min()
}

fn char_index(bounds: &[usize], byte: usize) -> Option<usize> {
    bounds.binary_search(&byte).ok()
}

/// Chunk one document, numbering chunks from `first_id`.
pub fn chunk_document(document: &Document, config: &ChunkConfig, first_id: usize) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = split_text(&document.text, config)
        .into_iter()
        .enumerate()
        .map(|(position, text)| Chunk {
            id: first_id + position,
            source: document.id.clone(),
            position,
            text,
        })
        .collect();

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        document.id,
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    chunks
}

/// Chunk documents in order with ids assigned sequentially across all of them.
pub fn chunk_documents(documents: &[Document], config: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for document in documents {
        let next = chunk_document(document, config, chunks.len());
        chunks.extend(next);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::path::PathBuf;

    fn config(chunk_size: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig::new(chunk_size, overlap).unwrap()
    }

    fn document(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            path: PathBuf::from(id),
            text: text.to_string(),
            sha256: String::new(),
            size_bytes: text.len() as u64,
        }
    }

    fn shared_len(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        (1..=a.len().min(b.len()))
            .rev()
            .find(|n| a[a.len() - n..] == b[..*n])
            .unwrap_or(0)
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", &config(100, 10)).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_text("short text", &config(100, 10)), vec!["short text"]);
    }

    #[test]
    fn test_words_with_overlap() {
        let pieces = split_text("A B C D", &config(4, 1));
        assert_eq!(pieces, vec!["A B ", " C D"]);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let cfg = config(120, 20);
        let pieces = split_text(&text, &cfg);

        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.chars().count() <= 120, "oversized: {:?}", piece);
        }
        for pair in pieces.windows(2) {
            let shared = shared_len(&pair[0], &pair[1]);
            assert!(shared >= 1 && shared >= 20, "overlap {} too small", shared);
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "alpha beta. ".repeat(3), "gamma delta. ".repeat(3));
        let pieces = split_text(&text, &config(50, 2));
        assert!(pieces[0].ends_with("\n\n"), "got {:?}", pieces[0]);
    }

    #[test]
    fn test_prefers_sentence_end_over_space() {
        let text = "One two three. Four five six seven eight nine";
        let pieces = split_text(text, &config(30, 0));
        assert_eq!(pieces[0], "One two three. ");
    }

    #[test]
    fn test_hard_split_for_long_token() {
        let text = "x".repeat(25);
        let pieces = split_text(&text, &config(10, 2));
        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(pieces[0], "x".repeat(10));
    }

    #[test]
    fn test_oversized_token_without_hard_split() {
        let cfg = ChunkConfig {
            chunk_size: 10,
            overlap: 2,
            hard_split: false,
        };
        let text = format!("{} tail words here", "y".repeat(30));
        let pieces = split_text(&text, &cfg);

        assert_eq!(pieces[0], format!("{} ", "y".repeat(30)));
        assert!(pieces.iter().skip(1).all(|p| p.chars().count() <= 10));
    }

    #[test]
    fn test_unicode_is_never_split_mid_char() {
        let text = "Gerenciar jogos é fácil 🎮 com o aplicativo brasileiro. ".repeat(10);
        let pieces = split_text(&text, &config(37, 5));
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.chars().count() <= 37);
        }
    }

    #[test]
    fn test_trailing_whitespace_is_not_a_chunk() {
        let text = format!("abc{}", " ".repeat(30));
        let pieces = split_text(&text, &config(10, 0));
        assert_eq!(pieces, vec!["abc       "]);
        assert!(split_text(" \n\t ", &config(10, 0)).is_empty());
    }

    #[test]
    fn test_blank_stretch_joins_next_chunk() {
        let pieces = split_text("? a b!é\n a?.éb?éé  ?é\n", &config(10, 1));
        assert_eq!(pieces, vec!["? a b!é\n", "\n a?.éb?éé", "é  ?é\n"]);
    }

    #[test]
    fn test_long_blank_run_keeps_chunks_joined() {
        let text = format!("alpha\n{}beta gamma", " ".repeat(20));
        let pieces = split_text(&text, &config(8, 2));

        assert_eq!(pieces.first().map(String::as_str), Some("alpha\n"));
        assert_eq!(pieces.last().map(String::as_str), Some("a gamma"));
        for piece in &pieces {
            assert!(piece.chars().count() <= 8, "oversized: {:?}", piece);
            assert!(!piece.trim().is_empty());
        }
        for pair in pieces.windows(2) {
            assert!(shared_len(&pair[0], &pair[1]) >= 1, "disjoint: {:?}", pair);
        }
    }

    fn longest_blank_run(text: &str) -> usize {
        let mut longest = 0;
        let mut run = 0;
        for c in text.chars() {
            run = if c.is_whitespace() { run + 1 } else { 0 };
            longest = longest.max(run);
        }
        longest
    }

    #[test]
    fn test_random_texts_keep_size_and_overlap() {
        const ALPHABET: [char; 10] = ['a', 'b', 'é', '?', '!', '.', ' ', ' ', '\n', '\t'];
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..2000 {
            let len = rng.gen_range(0..60);
            let text: String = (0..len)
                .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
                .collect();
            let size = rng.gen_range(2..16);
            let overlap = rng.gen_range(0..size);
            let pieces = split_text(&text, &config(size, overlap));

            for piece in &pieces {
                assert!(piece.chars().count() <= size, "{:?} {:?}", text, piece);
                assert!(!piece.trim().is_empty(), "{:?} gave a blank piece", text);
            }
            if !text.trim().is_empty() {
                assert!(!pieces.is_empty(), "{:?} lost its content", text);
            }

            // Only a blank run filling a whole window can separate two chunks.
            if overlap > 0 && longest_blank_run(&text) < size {
                for pair in pieces.windows(2) {
                    let shared = shared_len(&pair[0], &pair[1]);
                    assert!(
                        shared >= overlap,
                        "{:?} (size {}, overlap {}): {:?}",
                        text,
                        size,
                        overlap,
                        pair
                    );
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Line one.\nLine two!\n\nParagraph two? yes. ".repeat(20);
        let cfg = config(64, 8);
        assert_eq!(split_text(&text, &cfg), split_text(&text, &cfg));
    }

    #[test]
    fn test_invalid_config() {
        assert!(ChunkConfig::new(10, 10).is_err());
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(10, 9).is_ok());
    }

    #[test]
    fn test_overlap_clamped_when_unvalidated() {
        let cfg = ChunkConfig {
            chunk_size: 4,
            overlap: 9,
            hard_split: true,
        };
        let pieces = split_text("abcdefghij", &cfg);
        assert!(!pieces.is_empty());
        assert!(pieces.iter().all(|p| p.chars().count() <= 4));
    }

    #[test]
    fn test_ids_are_sequential_across_documents() {
        let docs = vec![
            document("a.txt", "one two three four five six"),
            document("b.txt", ""),
            document("c.txt", "seven eight nine ten eleven"),
        ];
        let chunks = chunk_documents(&docs, &config(12, 2));

        let ids: Vec<usize> = chunks.iter().map(|c| c.id).collect();
        let expected: Vec<usize> = (0..chunks.len()).collect();
        assert_eq!(ids, expected);

        assert_eq!(chunks[0].source, "a.txt");
        assert_eq!(chunks[0].position, 0);
        let first_c = chunks.iter().position(|c| c.source == "c.txt").unwrap();
        assert_eq!(chunks[first_c].position, 0);
        assert!(chunks.iter().all(|c| c.source != "b.txt"));
    }
}
