//! String helpers shared by the streamers and the summarizer.

use regex::Regex;

use crate::domain::ParseError;

/// Strip leading and trailing whitespace.
#[must_use]
pub fn trim(text: &str) -> &str {
    text.trim()
}

/// Split on a single character, keeping empty tokens between consecutive
/// delimiters. A string without the delimiter comes back as one token.
#[must_use]
pub fn split(text: &str, delimiter: char) -> Vec<String> {
    text.split(delimiter).map(str::to_string).collect()
}

/// Parse the `[ seconds ]` prefix of a kernel log line.
///
/// dmesg prints seconds since boot, e.g. `[ 3633.459327] ...`. Whitespace
/// inside the brackets is ignored.
///
/// # Errors
/// `ParseError::MissingTimestamp` when the line does not start with a
/// bracketed prefix, `ParseError::InvalidTimestamp` when its content is not a
/// number.
pub fn extract_timestamp(line: &str) -> Result<f64, ParseError> {
    let inner = line
        .trim_start()
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map(|(inner, _)| inner.trim())
        .ok_or_else(|| ParseError::MissingTimestamp(line.to_string()))?;

    inner
        .parse::<f64>()
        .map_err(|source| ParseError::InvalidTimestamp {
            value: inner.to_string(),
            source,
        })
}

/// Leading `MM-DD HH:MM:SS.mmm` of a logcat `threadtime` line, or an empty
/// string when the line does not start with one.
#[must_use]
pub fn extract_logcat_timestamp(line: &str) -> String {
    const LEN: usize = "MM-DD HH:MM:SS.mmm".len();

    let Some(candidate) = line.get(..LEN) else {
        return String::new();
    };
    let well_formed = candidate.char_indices().all(|(i, c)| match i {
        2 => c == '-',
        5 => c == ' ',
        8 | 11 => c == ':',
        14 => c == '.',
        _ => c.is_ascii_digit(),
    });

    if well_formed {
        candidate.to_string()
    } else {
        String::new()
    }
}

/// Leftmost match of `pattern` in `text`, returning every capture group.
///
/// Groups that did not participate in the match come back as empty strings.
/// `None` means "no match", which is not an error.
#[must_use]
pub fn capture_groups(pattern: &Regex, text: &str) -> Option<Vec<String>> {
    let caps = pattern.captures(text)?;
    Some(
        caps.iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect(),
    )
}
