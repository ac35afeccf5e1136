use chrono::{Duration, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{Currency, Engine, EngineError, Money, Store, UserIdentity, month_start};
use migration::MigratorTrait;

const ALICE: UserIdentity = UserIdentity(1001);
const BOB: UserIdentity = UserIdentity(1002);

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .timezone(chrono_tz::Europe::Kyiv)
        .build();
    (engine, db)
}

#[tokio::test]
async fn create_user_is_idempotent() {
    let (engine, _db) = engine_with_db().await;

    engine.create_user_if_absent(ALICE).await.unwrap();
    let first = engine.resolve_internal_user_id(ALICE).await.unwrap();
    engine.create_user_if_absent(ALICE).await.unwrap();
    let second = engine.resolve_internal_user_id(ALICE).await.unwrap();

    assert_eq!(first, second);

    let user = engine.user(ALICE).await.unwrap();
    assert_eq!(user.currency, None);
    assert_eq!(user.monthly_budget, Money::ZERO);
    assert_eq!(user.last_notified_at.timestamp(), 0);
}

#[tokio::test]
async fn unknown_user_is_key_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine.resolve_internal_user_id(BOB).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("user 1002".to_string()));

    let usd = Currency::try_from("USD").unwrap();
    assert!(matches!(
        engine.set_currency(BOB, &usd).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.set_monthly_budget(BOB, Money::new(100)).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn currency_and_budget_are_persisted() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();

    let uah = Currency::try_from("UAH").unwrap();
    engine.set_currency(ALICE, &uah).await.unwrap();
    engine
        .set_monthly_budget(ALICE, Money::new(150_000))
        .await
        .unwrap();

    let user = engine.user(ALICE).await.unwrap();
    assert_eq!(user.currency, Some(uah));
    assert_eq!(
        engine.monthly_budget(ALICE).await.unwrap(),
        Money::new(150_000)
    );
}

#[tokio::test]
async fn non_positive_budget_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();

    assert!(matches!(
        engine.set_monthly_budget(ALICE, Money::ZERO).await,
        Err(EngineError::InvalidAmount(_))
    ));
}

#[tokio::test]
async fn month_to_date_total_ignores_previous_months() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();
    let user_id = engine.resolve_internal_user_id(ALICE).await.unwrap();

    let this_month = month_start(Utc::now(), chrono_tz::Europe::Kyiv);
    engine
        .record_expense_at(
            user_id,
            Money::new(9_999),
            "rent",
            "",
            this_month - Duration::seconds(1),
        )
        .await
        .unwrap();
    engine
        .record_expense(user_id, Money::new(1_250), "food", "")
        .await
        .unwrap();
    engine
        .record_expense(user_id, Money::new(300), "coffee", "latte")
        .await
        .unwrap();

    assert_eq!(
        engine.month_to_date_expense_total(user_id).await.unwrap(),
        Money::new(1_550)
    );
}

#[tokio::test]
async fn month_to_date_total_is_per_user() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();
    engine.create_user_if_absent(BOB).await.unwrap();
    let alice = engine.resolve_internal_user_id(ALICE).await.unwrap();
    let bob = engine.resolve_internal_user_id(BOB).await.unwrap();

    engine
        .record_expense(alice, Money::new(500), "food", "")
        .await
        .unwrap();

    assert_eq!(
        engine.month_to_date_expense_total(bob).await.unwrap(),
        Money::ZERO
    );
}

#[tokio::test]
async fn invalid_expenses_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();
    let user_id = engine.resolve_internal_user_id(ALICE).await.unwrap();

    assert!(
        engine
            .record_expense(user_id, Money::ZERO, "food", "")
            .await
            .is_err()
    );
    assert!(matches!(
        engine
            .record_expense(user_id, Money::new(100), "  ", "")
            .await,
        Err(EngineError::InvalidCategory(_))
    ));
}

#[tokio::test]
async fn only_positive_budgets_are_listed() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();
    engine.create_user_if_absent(BOB).await.unwrap();
    engine
        .set_monthly_budget(ALICE, Money::new(10_000))
        .await
        .unwrap();

    assert_eq!(
        engine.users_with_positive_budget().await.unwrap(),
        vec![ALICE]
    );
}

#[tokio::test]
async fn budget_status_reports_remaining_and_percent() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();
    engine
        .set_monthly_budget(ALICE, Money::new(10_000))
        .await
        .unwrap();
    let user_id = engine.resolve_internal_user_id(ALICE).await.unwrap();
    engine
        .record_expense(user_id, Money::new(7_000), "rent", "")
        .await
        .unwrap();

    let status = engine.budget_status(ALICE, Utc::now()).await.unwrap();
    assert_eq!(status.remaining, Money::new(3_000));
    assert!((status.percent_spent - 70.0).abs() < f64::EPSILON);
    assert_eq!(status.last_notified_at.timestamp(), 0);
}

#[tokio::test]
async fn budget_status_without_budget_fails() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();

    assert!(matches!(
        engine.budget_status(ALICE, Utc::now()).await,
        Err(EngineError::InvalidAmount(_))
    ));
}

#[tokio::test]
async fn notification_timestamp_is_updated() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();
    engine
        .set_monthly_budget(ALICE, Money::new(10_000))
        .await
        .unwrap();

    let now = Utc::now();
    engine.record_notification_sent(ALICE, now).await.unwrap();

    let status = engine.budget_status(ALICE, Utc::now()).await.unwrap();
    assert_eq!(status.last_notified_at.timestamp(), now.timestamp());
}

#[tokio::test]
async fn budget_status_uses_the_month_of_the_given_instant() {
    let (engine, _db) = engine_with_db().await;
    engine.create_user_if_absent(ALICE).await.unwrap();
    engine
        .set_monthly_budget(ALICE, Money::new(10_000))
        .await
        .unwrap();
    let user_id = engine.resolve_internal_user_id(ALICE).await.unwrap();

    let march = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
    let april = Utc.with_ymd_and_hms(2025, 4, 10, 12, 0, 0).unwrap();
    engine
        .record_expense_at(user_id, Money::new(8_000), "rent", "", march)
        .await
        .unwrap();
    engine
        .record_expense_at(user_id, Money::new(1_000), "food", "", april)
        .await
        .unwrap();

    let in_march = engine.budget_status(ALICE, march).await.unwrap();
    assert_eq!(in_march.remaining, Money::new(2_000));
    assert!((in_march.percent_spent - 80.0).abs() < f64::EPSILON);

    let in_april = engine.budget_status(ALICE, april).await.unwrap();
    assert_eq!(in_april.remaining, Money::new(9_000));
    assert!((in_april.percent_spent - 10.0).abs() < f64::EPSILON);
}
