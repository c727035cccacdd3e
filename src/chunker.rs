//! Chunk normalization for long documents: merge short paragraphs, split long ones.
//!
//! The chunked classification strategy scores each chunk separately, so chunks
//! should carry enough context (a few hundred words) without exceeding what the
//! scorer looks at.

use serde::{Deserialize, Serialize};

/// Configuration for chunk normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChunkConfig {
    /// Minimum words per chunk (a short tail gets merged into its predecessor).
    pub min_words: usize,
    /// Buffer is flushed once it reaches this many words.
    pub target_words: usize,
    /// Maximum words per chunk (longer buffers get split at sentences).
    pub max_words: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_words: 50,
            target_words: 300,
            max_words: 500,
        }
    }
}

/// A normalized text chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// Sequential index within the document.
    pub index: usize,
    pub text: String,
    pub word_count: usize,
}

/// Normalize paragraphs into consistently sized chunks.
///
/// - Paragraphs accumulate until the buffer reaches `target_words`.
/// - A buffer above `max_words` is split at sentence boundaries.
/// - A trailing buffer below `min_words` is merged into the previous chunk.
pub fn chunk_paragraphs<S: AsRef<str>>(paragraphs: &[S], config: &ChunkConfig) -> Vec<TextChunk> {
    let mut result: Vec<TextChunk> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_words = 0usize;

    for para in paragraphs {
        let para = para.as_ref().trim();
        let words = para.split_whitespace().count();
        if words == 0 {
            continue;
        }
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(para);
        buffer_words += words;

        if buffer_words >= config.target_words {
            emit(&mut result, &buffer, config);
            buffer.clear();
            buffer_words = 0;
        }
    }

    if !buffer.is_empty() {
        match result.last_mut() {
            Some(last) if buffer_words < config.min_words => {
                last.text.push(' ');
                last.text.push_str(&buffer);
                last.word_count += buffer_words;
            }
            _ => emit(&mut result, &buffer, config),
        }
    }

    result
}

/// Push one or more chunks from `text`, splitting at sentences past `max_words`.
fn emit(result: &mut Vec<TextChunk>, text: &str, config: &ChunkConfig) {
    let word_count = text.split_whitespace().count();
    if word_count <= config.max_words {
        push(result, text.to_string(), word_count);
        return;
    }

    let mut current = String::new();
    let mut current_words = 0usize;
    for sentence in split_at_sentences(text) {
        let sw = sentence.split_whitespace().count();
        if current_words + sw > config.max_words && !current.is_empty() {
            push(result, std::mem::take(&mut current), current_words);
            current_words = 0;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
        current_words += sw;
    }
    if !current.is_empty() {
        push(result, current, current_words);
    }
}

fn push(result: &mut Vec<TextChunk>, text: String, word_count: usize) {
    result.push(TextChunk {
        index: result.len(),
        text,
        word_count,
    });
}

/// Split text at sentence boundaries (`.`, `!`, `?` followed by whitespace).
fn split_at_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = matches!(ch, '.' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if at_boundary {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_paragraphs_merged() {
        let paras = ["Hello world.", "Another sentence.", "Third one."];
        let config = ChunkConfig {
            min_words: 5,
            target_words: 10,
            max_words: 50,
        };
        let result = chunk_paragraphs(&paras, &config);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "Hello world. Another sentence. Third one.");
        assert_eq!(result[0].word_count, 6);
    }

    #[test]
    fn short_tail_folds_into_previous() {
        let paras = ["one two three four", "five"];
        let config = ChunkConfig {
            min_words: 2,
            target_words: 4,
            max_words: 10,
        };
        let result = chunk_paragraphs(&paras, &config);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].word_count, 5);
    }

    #[test]
    fn long_paragraph_split_at_sentences() {
        let sentence = "This is a test sentence with multiple words.";
        let text = vec![sentence; 20].join(" ");
        let config = ChunkConfig {
            min_words: 5,
            target_words: 30,
            max_words: 40,
        };
        let result = chunk_paragraphs(&[text], &config);
        assert!(result.len() > 1, "should split into multiple chunks");
        for (i, chunk) in result.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.word_count <= config.max_words);
        }
        let total: usize = result.iter().map(|c| c.word_count).sum();
        assert_eq!(total, 160);
    }

    #[test]
    fn decimal_points_are_not_boundaries() {
        let sentences = split_at_sentences("Version 2.5 shipped. Next? Soon!");
        assert_eq!(sentences, vec!["Version 2.5 shipped.", "Next?", "Soon!"]);
    }

    #[test]
    fn empty_input() {
        let empty: [&str; 0] = [];
        assert!(chunk_paragraphs(&empty, &ChunkConfig::default()).is_empty());
        assert!(chunk_paragraphs(&["  ", ""], &ChunkConfig::default()).is_empty());
    }
}
