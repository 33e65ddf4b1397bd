//! Word-level diff for showing two targets side by side
//!
//! A single linear pass with a small resynchronization window rather than a full LCS: it
//! is not guaranteed minimal, but it stays fast on arbitrarily long strings.

use serde::{Deserialize, Serialize};

/// How far ahead to look for a matching token after a mismatch
pub const LOOKAHEAD_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Unchanged,
    Added,
    Removed,
}

/// A run of text with its diff status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPart {
    pub text: String,
    pub kind: DiffKind,
}

impl DiffPart {
    fn new(text: &str, kind: DiffKind) -> Self {
        DiffPart {
            text: text.to_string(),
            kind,
        }
    }
}

/// Split into alternating runs of whitespace and non-whitespace
///
/// Whitespace runs are tokens of their own so the parts concatenate back to the input.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (index, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(current) if current != space => {
                tokens.push(&text[start..index]);
                start = index;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Position of `token` in `tokens[from + 1..=from + LOOKAHEAD_WINDOW]`
fn resync(tokens: &[&str], from: usize, token: &str) -> Option<usize> {
    let end = (from + 1 + LOOKAHEAD_WINDOW).min(tokens.len());
    (from + 1..end).find(|&k| tokens[k] == token)
}

/// Word-level diff turning `old` into `new`
///
/// Adjacent parts of the same kind are coalesced. Concatenating the unchanged and removed
/// parts gives back `old`; unchanged and added parts give back `new`.
pub fn diff_words(old: &str, new: &str) -> Vec<DiffPart> {
    let a = tokenize(old);
    let b = tokenize(new);
    let mut parts: Vec<DiffPart> = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            push(&mut parts, a[i], DiffKind::Unchanged);
            i += 1;
            j += 1;
            continue;
        }

        // Where does the other side pick up again?
        let in_new = resync(&b, j, a[i]);
        let in_old = resync(&a, i, b[j]);

        match (in_new, in_old) {
            (Some(k), Some(l)) if k - j <= l - i => {
                push_all(&mut parts, &b[j..k], DiffKind::Added);
                j = k;
            }
            (Some(k), None) => {
                push_all(&mut parts, &b[j..k], DiffKind::Added);
                j = k;
            }
            (_, Some(l)) => {
                push_all(&mut parts, &a[i..l], DiffKind::Removed);
                i = l;
            }
            (None, None) => {
                push(&mut parts, a[i], DiffKind::Removed);
                push(&mut parts, b[j], DiffKind::Added);
                i += 1;
                j += 1;
            }
        }
    }

    push_all(&mut parts, &a[i..], DiffKind::Removed);
    push_all(&mut parts, &b[j..], DiffKind::Added);
    parts
}

fn push(parts: &mut Vec<DiffPart>, token: &str, kind: DiffKind) {
    match parts.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(token),
        _ => parts.push(DiffPart::new(token, kind)),
    }
}

fn push_all(parts: &mut Vec<DiffPart>, tokens: &[&str], kind: DiffKind) {
    for token in tokens {
        push(parts, token, kind);
    }
}
