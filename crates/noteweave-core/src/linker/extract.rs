use once_cell::sync::Lazy;
use regex::Regex;

static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("valid wikilink regex"));

/// Sentence terminators bounding a context snippet.
const TERMINATORS: [char; 4] = ['.', '!', '?', '\n'];

/// One `[[title]]` occurrence in note text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    /// Title between the brackets, whitespace-trimmed.
    pub title: String,
    /// The full match including brackets, verbatim.
    pub match_text: String,
    /// Byte offset of the match in the source text.
    pub start: usize,
}

impl Mention {
    pub fn end(&self) -> usize {
        self.start + self.match_text.len()
    }
}

/// Every wikilink in `text`, in order of appearance. Repeats are kept.
pub fn extract_mentions(text: &str) -> Vec<Mention> {
    WIKILINK_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let title = caps.get(1)?.as_str().trim();
            if title.is_empty() {
                return None;
            }
            Some(Mention {
                title: title.to_string(),
                match_text: whole.as_str().to_string(),
                start: whole.start(),
            })
        })
        .collect()
}

/// Sentence-bounded snippet around the match at `start..start + len`.
///
/// Starts just after the nearest terminator before the match (or at the
/// start of the text) and ends at and including the nearest terminator
/// after it (or at the end of the text). The result is trimmed and always
/// contains the match verbatim.
///
/// `start` and `len` are byte offsets. Offsets that fall inside a
/// multi-byte char are widened to the enclosing char boundaries.
pub fn extract_context(text: &str, start: usize, len: usize) -> String {
    let end = ceil_char_boundary(text, start.saturating_add(len));
    let start = floor_char_boundary(text, start).min(end);
    let is_terminator = |c: char| TERMINATORS.contains(&c);

    // Terminators are single-byte, so +1 stays on a char boundary.
    let begin = text[..start].rfind(is_terminator).map_or(0, |i| i + 1);
    let finish = text[end..]
        .find(is_terminator)
        .map_or(text.len(), |i| end + i + 1);

    text[begin..finish].trim().to_string()
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Shorten `context` to at most `max_chars` chars, keeping `match_text`
/// whole and splitting the remaining budget around it.
pub fn clip_context(context: &str, match_text: &str, max_chars: usize) -> String {
    if context.chars().count() <= max_chars {
        return context.to_string();
    }

    let Some(pos) = context.find(match_text) else {
        return context.chars().take(max_chars).collect();
    };

    let match_chars = match_text.chars().count();
    if match_chars >= max_chars {
        return match_text.to_string();
    }

    let before: Vec<char> = context[..pos].chars().collect();
    let after: Vec<char> = context[pos + match_text.len()..].chars().collect();

    let budget = max_chars - match_chars;
    let take_after = (budget - (budget / 2).min(before.len())).min(after.len());
    let take_before = (budget - take_after).min(before.len());

    let prefix: String = before[before.len() - take_before..].iter().collect();
    let suffix: String = after[..take_after].iter().collect();

    format!("{}{}{}", prefix, match_text, suffix)
        .trim()
        .to_string()
}
