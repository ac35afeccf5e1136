use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::messenger::Choice;

/// Renders choices as a single row of inline buttons.
pub(crate) fn choice_keyboard(choices: &[Choice]) -> InlineKeyboardMarkup {
    let row = choices
        .iter()
        .map(|c| InlineKeyboardButton::callback(c.label.clone(), c.token.clone()))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![row])
}
