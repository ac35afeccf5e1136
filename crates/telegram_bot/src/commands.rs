//! Command structs

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(
    rename_rule = "lowercase",
    description = "Команди трекера витрат:"
)]
pub enum Command {
    #[command(description = "Реєстрація та вибір валюти.")]
    Start,
    #[command(description = "Показати це повідомлення.")]
    Help,
    #[command(description = "Змінити валюту.")]
    SetCurrency,
    #[command(description = "Встановити місячний бюджет.")]
    SetBudget,
    #[command(description = "Додати витрату.")]
    AddExpense,
    #[command(description = "Скасувати поточну дію.")]
    Cancel,
}
