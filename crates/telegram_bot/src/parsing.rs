use engine::Money;

use crate::texts::SKIP_KEYWORD;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ParseError {
    #[error("invalid amount")]
    InvalidAmount,
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("empty text")]
    Empty,
}

/// Parses a budget or expense amount typed by the user.
///
/// `12.50`, `12,5` and `+12` are accepted; anything that is not a decimal
/// with at most two fraction digits, or is not strictly positive, is not.
pub(crate) fn parse_amount(input: &str) -> Result<Money, ParseError> {
    let amount = input
        .parse::<Money>()
        .map_err(|_| ParseError::InvalidAmount)?;
    if !amount.is_positive() {
        return Err(ParseError::NonPositiveAmount);
    }
    Ok(amount)
}

pub(crate) fn parse_category(input: &str) -> Result<String, ParseError> {
    let category = input.trim();
    if category.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(category.to_string())
}

/// The note is optional: the skip keyword (any letter case) yields an empty
/// note.
pub(crate) fn parse_note(input: &str) -> String {
    let note = input.trim();
    if note.to_lowercase() == SKIP_KEYWORD {
        return String::new();
    }
    note.to_string()
}
