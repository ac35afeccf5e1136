use std::error::Error;

use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use engine::{Engine, EngineError, Money, Store, UserIdentity};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "expense_tracker_admin")]
#[command(about = "Admin utilities for the expense tracker (inspect users, fix budgets)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./expenses.db?mode=rwc"
    )]
    database_url: String,

    /// Time zone of the calendar months.
    #[arg(long, env = "EXPENSES__APP__TIMEZONE", default_value = "Europe/Kyiv")]
    timezone: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Budget(Budget),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Show(UserShowArgs),
    SetBudget(UserSetBudgetArgs),
}

#[derive(Args, Debug)]
struct UserShowArgs {
    #[arg(long)]
    telegram_id: i64,
}

#[derive(Args, Debug)]
struct UserSetBudgetArgs {
    #[arg(long)]
    telegram_id: i64,
    /// Decimal amount, e.g. `1500` or `1500.50`.
    #[arg(long)]
    amount: String,
}

#[derive(Args, Debug)]
struct Budget {
    #[command(subcommand)]
    command: BudgetCommand,
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    List,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn show_user(engine: &Engine, identity: UserIdentity) -> Result<(), EngineError> {
    let user = engine.user(identity).await?;
    let spent = engine.month_to_date_expense_total(user.id).await?;

    println!("telegram id:   {identity}");
    println!("registered:    {}", user.created_at);
    println!(
        "currency:      {}",
        user.currency
            .as_ref()
            .map_or("-", |currency| currency.code())
    );
    println!("budget:        {}", user.monthly_budget);
    println!("month to date: {spent}");

    if user.monthly_budget.is_positive() {
        let status = engine.budget_status(identity, Utc::now()).await?;
        println!("remaining:     {}", status.remaining);
        println!("spent:         {:.2}%", status.percent_spent);
        println!("last warning:  {}", status.last_notified_at);
    }
    Ok(())
}

async fn list_budgets(engine: &Engine) -> Result<(), EngineError> {
    for identity in engine.users_with_positive_budget().await? {
        match engine.budget_status(identity, Utc::now()).await {
            Ok(status) => println!(
                "{identity}\t{:.2}%\t{}",
                status.percent_spent, status.remaining
            ),
            Err(err) => eprintln!("{identity}\terror: {err}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let timezone: Tz = match cli.timezone.parse() {
        Ok(tz) => tz,
        Err(err) => {
            eprintln!("invalid timezone {:?}: {err}", cli.timezone);
            std::process::exit(2);
        }
    };
    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).timezone(timezone).build();

    match cli.command {
        Command::User(User {
            command: UserCommand::Show(args),
        }) => {
            let identity = UserIdentity(args.telegram_id);
            if let Err(err) = show_user(&engine, identity).await {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
        Command::User(User {
            command: UserCommand::SetBudget(args),
        }) => {
            let amount: Money = match args.amount.parse() {
                Ok(amount) => amount,
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            };
            let identity = UserIdentity(args.telegram_id);
            if let Err(err) = engine.set_monthly_budget(identity, amount).await {
                eprintln!("{err}");
                std::process::exit(1);
            }
            println!("monthly budget of {identity} set to {amount}");
        }
        Command::Budget(Budget {
            command: BudgetCommand::List,
        }) => list_budgets(&engine).await?,
    }

    Ok(())
}
