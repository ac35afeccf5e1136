//! Fixed user-facing strings.

use engine::Money;

/// Typing this at the note step (in any letter case) leaves the note empty.
pub const SKIP_KEYWORD: &str = "пропустити";

pub(crate) const UNKNOWN_SENDER: &str = "Не вдалося визначити користувача.";
pub(crate) const WELCOME: &str = "Ласкаво просимо до трекера витрат! Оберіть валюту:";
pub(crate) const CHOOSE_NEW_CURRENCY: &str = "Оберіть нову валюту:";
pub(crate) const REGISTRATION_FAILED: &str = "Сталася помилка при додаванні вас до бази.";

pub(crate) const ASK_BUDGET: &str = "Будь ласка, введіть бажаний місячний бюджет:";
pub(crate) const INVALID_BUDGET: &str = "Будь ласка, введіть коректну суму бюджету.";
pub(crate) const BUDGET_SAVE_FAILED: &str =
    "Сталася помилка при збереженні бюджету. Спробуйте ще раз.";

pub(crate) const ASK_AMOUNT: &str = "Вкажіть суму витрати:";
pub(crate) const INVALID_AMOUNT: &str = "Будь ласка, введіть коректну суму.";
pub(crate) const ASK_CATEGORY: &str = "Вкажіть категорію витрати:";
pub(crate) const EMPTY_CATEGORY: &str = "Категорія не може бути порожньою.";
pub(crate) const PROFILE_NOT_FOUND: &str =
    "Ваш профіль не знайдено. Будь ласка, скористайтесь командою /start для реєстрації.";
pub(crate) const EXPENSE_SAVE_FAILED: &str =
    "Сталася помилка при збереженні витрати. Спробуйте ще раз.";
pub(crate) const TOTAL_FAILED: &str = "Сталася помилка при розрахунку місячних витрат.";
pub(crate) const LOW_BALANCE_WARNING: &str = "\n⚠️ Увага! У вашому бюджеті залишилось менше 10%.";

pub(crate) const CANCELLED: &str = "Дію скасовано.";
pub(crate) const NOTHING_TO_CANCEL: &str = "Немає активної дії для скасування.";

pub(crate) const CURRENCY_SAVED: &str = "Валюта успішно збережена!";
pub(crate) const INVALID_CURRENCY: &str = "Некоректна валюта. Спробуйте ще раз.";
pub(crate) const GENERIC_ERROR: &str = "Сталася помилка. Спробуйте ще раз.";
pub(crate) const INVALID_REQUEST: &str = "Некоректний запит.";

pub(crate) fn ask_note() -> String {
    format!("Додайте коментар до витрати (або напишіть \"{SKIP_KEYWORD}\"):")
}

pub(crate) fn budget_saved(amount: Money) -> String {
    format!("Місячний бюджет успішно встановлено: {amount}")
}

pub(crate) fn expense_saved(amount: Money, category: &str, month_total: Money) -> String {
    format!(
        "Витрату {amount} {category} успішно додано!\nЗагальна сума витрат за поточний місяць: {month_total}"
    )
}

pub(crate) fn remaining_budget(remaining: Money) -> String {
    format!("\nЗалишок у місячному бюджеті: {remaining}")
}

pub(crate) fn budget_warning(percent_spent: f64, remaining: Money) -> String {
    format!("⚠️ Ви витратили {percent_spent:.2}% вашого бюджету. Залишок: {remaining}.")
}
