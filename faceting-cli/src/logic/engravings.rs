use faceting_engine::Detection;
use thiserror::Error;

/// Score assumed for entries given without one.
const CERTAIN_MATCH: f64 = 1.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectionParseError {
    #[error("engraving entry {position} has no name")]
    MissingName { position: usize },
    #[error("engraving entry {position} ('{token}') needs a score between 0 and 1")]
    Score { position: usize, token: String },
}

/// Parse detected engravings in screen order, e.g.
/// `"Cursed Doll:0.97, Grudge, Atk. Power Reduction:0.9"`.
///
/// # Errors
///
/// Returns the first entry with an empty name or an unusable score.
pub fn parse_detections(input: &str) -> Result<Vec<Detection>, DetectionParseError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| parse_entry(index + 1, token))
        .collect()
}

fn parse_entry(position: usize, token: &str) -> Result<Detection, DetectionParseError> {
    let (name, score) = match token.rsplit_once(':') {
        Some((name, raw)) => {
            let score = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|score| (0.0..=1.0).contains(score))
                .ok_or_else(|| DetectionParseError::Score {
                    position,
                    token: token.to_string(),
                })?;
            (name.trim(), score)
        }
        None => (token, CERTAIN_MATCH),
    };
    if name.is_empty() {
        return Err(DetectionParseError::MissingName { position });
    }
    Ok(Detection::new(name, score))
}
