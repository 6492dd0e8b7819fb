//! Splitting a raw token stream into dash-delimited chunks

use std::ops::Range;
use tracing::debug;

/// Split `raw` at bare `-` tokens.
///
/// A `-` right after a `--name` key is that key's value, not a delimiter.
/// Empty chunks are skipped.
///
/// ```
/// use cliapi::dispatch::split_chunks;
///
/// let raw = ["a", "-", "b", "--c", "-", "-", "-", "d"];
/// assert_eq!(split_chunks(&raw), vec![0..1, 2..5, 7..8]);
/// ```
pub fn split_chunks<S: AsRef<str>>(raw: &[S]) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut after_key = false;

    for (index, token) in raw.iter().enumerate() {
        let token = token.as_ref();
        if !after_key && token == "-" {
            push_chunk(&mut chunks, start..index);
            start = index + 1;
            after_key = false;
        } else {
            after_key = token.len() > 2 && token.starts_with("--");
        }
    }
    push_chunk(&mut chunks, start..raw.len());
    chunks
}

fn push_chunk(chunks: &mut Vec<Range<usize>>, chunk: Range<usize>) {
    if chunk.is_empty() {
        debug!(chunk = chunks.len() + 1, "Skipping empty arguments chunk");
    } else {
        chunks.push(chunk);
    }
}
