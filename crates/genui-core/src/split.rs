//! Splitting a streamed response into prose and patches.
//!
//! The model is asked to answer with a short conversational reply, a line
//! holding only `---`, and then patch lines. [`split_response`] is called
//! again on the full accumulated text every time a chunk arrives, so it
//! keeps no state and only ever looks at what it is given.

/// The sentinel line between the conversational and patch sections.
pub const SEPARATOR: &str = "---";

/// A line starting like this is taken as the start of a patch stream even
/// when the model skipped the prose and the separator.
const PATCH_OP_PREFIXES: [&str; 2] = [r#"{"op":"#, r#"{ "op":"#];

/// The two sections of a (possibly partial) response. Both are trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseParts<'a> {
    pub conversation: &'a str,
    pub patches: &'a str,
    /// Whether a separator line has been seen.
    pub separated: bool,
}

impl ResponseParts<'_> {
    pub fn has_patches(&self) -> bool {
        !self.patches.is_empty()
    }
}

/// Split `text` at the first separator line.
///
/// Without a separator the whole text counts as patches if it looks like a
/// patch stream; otherwise it is all prose and there is nothing to apply yet.
pub fn split_response(text: &str) -> ResponseParts<'_> {
    if let Some((start, end)) = find_separator(text) {
        return ResponseParts {
            conversation: text[..start].trim(),
            patches: text[end..].trim(),
            separated: true,
        };
    }

    let trimmed = text.trim();
    if looks_like_patch_stream(trimmed) {
        ResponseParts {
            conversation: "",
            patches: trimmed,
            separated: false,
        }
    } else {
        ResponseParts {
            conversation: trimmed,
            patches: "",
            separated: false,
        }
    }
}

/// Byte range of the first separator line, newline included.
fn find_separator(text: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line_content(line) == SEPARATOR {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

/// `line` without its `\n` or `\r\n` terminator.
fn line_content(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn looks_like_patch_stream(trimmed: &str) -> bool {
    trimmed.starts_with('{') || PATCH_OP_PREFIXES.iter().any(|p| trimmed.contains(p))
}
