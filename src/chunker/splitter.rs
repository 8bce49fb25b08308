use super::{ChunkConfig, ChunkError};

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SENTENCE_SEPARATOR: &str = ". ";
const LINE_SEPARATOR: char = '\n';
const SENTENCE_JOIN: &str = " ";

/// Validate the parameters and split `text` into overlapping chunks.
///
/// Validation always runs first, so a bad configuration is reported even
/// for empty input.
pub fn chunk_text(text: &str, max_size: i64, overlap: i64) -> Result<Vec<String>, ChunkError> {
    let config = ChunkConfig::new(max_size, overlap)?;
    Ok(split(text, &config))
}

/// Split text into chunks according to the rules:
/// - Merge paragraphs while the chunk stays within max_size
/// - Carry the last few words of a flushed chunk into the next one
/// - Fall back to sentences for paragraphs that exceed max_size
/// - Fall back to fixed character windows for sentences that exceed max_size
pub fn split(text: &str, config: &ChunkConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![];
    }

    let max_size = config.max_size();
    let mut chunks = Vec::new();
    let mut current = Accumulator::new(PARAGRAPH_SEPARATOR);

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        if paragraph.trim().is_empty() {
            continue;
        }

        let paragraph_len = char_len(paragraph);
        if current.fits(paragraph_len, max_size) {
            current.push(paragraph, paragraph_len);
            continue;
        }

        // Accumulator can only be empty here when the paragraph alone overflows
        let flushed = current.take();

        if paragraph_len > max_size {
            chunks.extend(flushed);
            split_paragraph(paragraph, config, &mut chunks);
            continue;
        }

        if let Some(previous) = flushed {
            let carry = trailing_words(&previous, config.overlap_words());
            chunks.push(previous);
            if !carry.is_empty() {
                let carry_len = char_len(&carry);
                current.push(&carry, carry_len);
            }
        }
        // May exceed max_size by the carried words; the next paragraph flushes it
        current.push(paragraph, paragraph_len);
    }

    chunks.extend(current.take());
    chunks
}

/// Sentence pass for a paragraph that does not fit in a single chunk.
/// No word overlap is carried between sentence chunks.
fn split_paragraph(paragraph: &str, config: &ChunkConfig, chunks: &mut Vec<String>) {
    let max_size = config.max_size();
    let mut current = Accumulator::new(SENTENCE_JOIN);

    for sentence in sentences(paragraph) {
        if sentence.trim().is_empty() {
            continue;
        }

        let sentence_len = char_len(sentence);
        if current.fits(sentence_len, max_size) {
            current.push(sentence, sentence_len);
            continue;
        }

        chunks.extend(current.take());

        if sentence_len > max_size {
            split_sentence(sentence, config, chunks);
        } else {
            current.push(sentence, sentence_len);
        }
    }

    chunks.extend(current.take());
}

/// Character pass: windows of exactly max_size characters advancing by the
/// stride, until a window reaches the end of the sentence.
fn split_sentence(sentence: &str, config: &ChunkConfig, chunks: &mut Vec<String>) {
    // Byte offset of every character boundary, including the end
    let boundaries: Vec<usize> = sentence
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(sentence.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut start = 0;
    loop {
        let end = (start + config.max_size()).min(char_count);
        chunks.push(sentence[boundaries[start]..boundaries[end]].to_string());

        if end == char_count {
            break;
        }
        start += config.stride();
    }
}

/// Approximate sentence boundaries on period-space and on line breaks, so
/// hard-wrapped text splits at line ends. The period stays with the
/// sentence it ends, the space is dropped.
fn sentences(paragraph: &str) -> impl Iterator<Item = &str> {
    paragraph
        .split_inclusive(SENTENCE_SEPARATOR)
        .map(|sentence| sentence.strip_suffix(' ').unwrap_or(sentence))
        .flat_map(|sentence| sentence.split(LINE_SEPARATOR))
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// The last `count` whitespace-separated words of `text`, joined by spaces
fn trailing_words(text: &str, count: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let take = count.min(words.len());
    words[words.len() - take..].join(" ")
}

/// Length in characters, the unit every size limit is expressed in
fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Growing chunk that tracks its own character length
struct Accumulator {
    separator: &'static str,
    text: String,
    len: usize,
}

impl Accumulator {
    fn new(separator: &'static str) -> Self {
        Self {
            separator,
            text: String::new(),
            len: 0,
        }
    }

    /// Length the chunk would have after joining a unit of `unit_len` characters.
    /// The separator counts, so a joined chunk never exceeds the limit.
    fn prospective_len(&self, unit_len: usize) -> usize {
        if self.text.is_empty() {
            unit_len
        } else {
            self.len + char_len(self.separator) + unit_len
        }
    }

    fn fits(&self, unit_len: usize, max_size: usize) -> bool {
        self.prospective_len(unit_len) <= max_size
    }

    fn push(&mut self, unit: &str, unit_len: usize) {
        self.len = self.prospective_len(unit_len);
        if !self.text.is_empty() {
            self.text.push_str(self.separator);
        }
        self.text.push_str(unit);
    }

    /// Hand over the accumulated chunk, leaving the accumulator empty
    fn take(&mut self) -> Option<String> {
        if self.text.is_empty() {
            return None;
        }
        self.len = 0;
        Some(std::mem::take(&mut self.text))
    }
}
