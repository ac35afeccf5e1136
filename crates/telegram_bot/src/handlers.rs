use engine::UserIdentity;
use teloxide::{
    RequestError,
    dispatching::{HandlerExt, UpdateHandler},
    prelude::*,
    types::{CallbackQuery, User},
    utils::command::BotCommands,
};

use crate::{
    ConfigParameters,
    commands::Command,
    currency::{CurrencyReply, CurrencySelector},
    messenger::Outbound,
    texts,
};

/// Commands first, then free text, then button presses.
pub(crate) fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_text))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

async fn handle_command(msg: Message, cmd: Command, cfg: ConfigParameters) -> ResponseResult<()> {
    if !is_allowed(cfg.allowed_users.as_deref(), msg.from.as_ref().map(|u| u.id)) {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref().and_then(identity_of) else {
        tracing::warn!(chat = msg.chat.id.0, "command without a usable sender");
        return Ok(());
    };
    tracing::debug!(user = %user, "command {cmd:?}");

    let reply = match cmd {
        Command::Start => match cfg.store.create_user_if_absent(user).await {
            Ok(()) => cfg.currencies.keyboard(texts::WELCOME),
            Err(err) => {
                tracing::error!(user = %user, "failed to register user: {err}");
                Outbound::text(texts::REGISTRATION_FAILED)
            }
        },
        Command::Help => Outbound::text(Command::descriptions().to_string()),
        Command::SetCurrency => cfg.currencies.keyboard(texts::CHOOSE_NEW_CURRENCY),
        Command::SetBudget => {
            let prompt = cfg.conversation.start_budget_flow(user).await;
            return reply_in_flow(&cfg, user, vec![prompt]).await;
        }
        Command::AddExpense => {
            let prompt = cfg.conversation.start_expense_flow(user).await;
            return reply_in_flow(&cfg, user, vec![prompt]).await;
        }
        Command::Cancel => cfg.conversation.cancel(user).await,
    };

    if let Err(err) = cfg.messenger.deliver(user, &reply).await {
        tracing::error!(user = %user, "failed to send reply: {err}");
    }
    Ok(())
}

async fn handle_text(msg: Message, cfg: ConfigParameters) -> ResponseResult<()> {
    if !is_allowed(cfg.allowed_users.as_deref(), msg.from.as_ref().map(|u| u.id)) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from.as_ref().and_then(identity_of) else {
        return Ok(());
    };

    let replies = cfg.conversation.handle_text(user, text).await;
    reply_in_flow(&cfg, user, replies).await
}

async fn handle_callback(bot: Bot, q: CallbackQuery, cfg: ConfigParameters) -> ResponseResult<()> {
    if !is_allowed(cfg.allowed_users.as_deref(), Some(q.from.id)) {
        return Ok(());
    }
    let Some(user) = identity_of(&q.from) else {
        bot.answer_callback_query(q.id.clone())
            .text(texts::UNKNOWN_SENDER)
            .await?;
        return Ok(());
    };

    let Some(code) = q.data.as_deref().and_then(CurrencySelector::parse_token) else {
        tracing::warn!(user = %user, "unexpected callback data {:?}", q.data);
        bot.answer_callback_query(q.id.clone())
            .text(texts::INVALID_REQUEST)
            .await?;
        return Ok(());
    };

    match cfg.currencies.handle_selection(user, code).await {
        CurrencyReply::Confirmed(text) => {
            bot.answer_callback_query(q.id.clone()).await?;
            if let Some(message) = q.message.as_ref() {
                match bot
                    .edit_message_text(message.chat().id, message.id(), text.clone())
                    .await
                {
                    Ok(_) => return Ok(()),
                    Err(err) => {
                        tracing::warn!(user = %user, "failed to edit currency picker: {err}")
                    }
                }
            }
            if let Err(err) = cfg.messenger.send_text(user, &text).await {
                tracing::error!(user = %user, "failed to confirm currency: {err}");
            }
        }
        CurrencyReply::Rejected(text) => {
            bot.answer_callback_query(q.id.clone()).text(text).await?;
        }
    }
    Ok(())
}

/// Replies inside a flow; the flow is dropped when they cannot be sent.
async fn reply_in_flow(
    cfg: &ConfigParameters,
    user: UserIdentity,
    replies: Vec<Outbound>,
) -> ResponseResult<()> {
    // Already logged, and the flow is gone.
    let _ = cfg
        .conversation
        .send_replies(cfg.messenger.as_ref(), user, replies)
        .await;
    Ok(())
}

fn identity_of(user: &User) -> Option<UserIdentity> {
    i64::try_from(user.id.0).ok().map(UserIdentity)
}

fn is_allowed(allowed_users: Option<&[UserId]>, from: Option<UserId>) -> bool {
    let Some(from) = from else {
        return false;
    };
    match allowed_users {
        None => true,
        Some(ids) => ids.contains(&from),
    }
}
