//! Classification of a line returned by the genuine reader.

/// The only in-band control token. Compared byte for byte, no trimming.
pub const UNDO_TOKEN: &[u8] = b"undo";

/// What the engine does with one read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The reader reported end of input.
    EndOfInput,
    /// The line is exactly [`UNDO_TOKEN`].
    Undo,
    /// Any other line: checkpoint, then hand it to the host.
    Accept,
}

/// Classify a read result (`None` is end of input).
pub fn classify(line: Option<&[u8]>) -> LineKind {
    match line {
        None => LineKind::EndOfInput,
        Some(line) if line == UNDO_TOKEN => LineKind::Undo,
        Some(_) => LineKind::Accept,
    }
}
