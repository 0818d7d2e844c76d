use faceting_engine::{Action, Event};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// `<kind><outcome>`, e.g. `1+`, `2-`, `3s`, `1:fail`.
static TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^([123])\s*[:/]?\s*(\+|-|s|f|success|fail|failure)$").ok()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryParseError {
    #[error("history entry {position} ('{token}') is not of the form <1|2|3><+|-|s|f>")]
    Malformed { position: usize, token: String },
}

/// Parse a comma or whitespace separated event list such as `"1+,1-,2s,3f"`.
///
/// # Errors
///
/// Returns [`HistoryParseError::Malformed`] for the first unrecognised token.
pub fn parse_history(input: &str) -> Result<Vec<Event>, HistoryParseError> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| parse_token(index + 1, token))
        .collect()
}

fn parse_token(position: usize, token: &str) -> Result<Event, HistoryParseError> {
    let malformed = || HistoryParseError::Malformed {
        position,
        token: token.to_string(),
    };
    let captures = TOKEN
        .as_ref()
        .and_then(|pattern| pattern.captures(token))
        .ok_or_else(malformed)?;
    let kind = captures[1].parse::<u8>().map_err(|_| malformed())?;
    let action = Action::from_kind(kind).ok_or_else(malformed)?;
    let succeeded = matches!(
        captures[2].to_ascii_lowercase().as_str(),
        "+" | "s" | "success"
    );
    Ok(Event::new(action, succeeded))
}

/// Render events back into the compact token form.
#[must_use]
pub fn format_history(history: &[Event]) -> String {
    history
        .iter()
        .map(|event| {
            format!(
                "{}{}",
                event.action.kind(),
                if event.succeeded { '+' } else { '-' }
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}
