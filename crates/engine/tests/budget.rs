use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{AllocationKind, DEFAULT_TIMEZONE, Engine, Money, util::days_in_month};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder().database(db.clone()).build();
    (engine, db)
}

fn today() -> NaiveDate {
    Utc::now().with_timezone(&DEFAULT_TIMEZONE).date_naive()
}

async fn account_with_buckets(engine: &Engine) -> i32 {
    engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap()
        .account
        .id
}

async fn insert_budget_row(
    db: &DatabaseConnection,
    account_id: i32,
    date: NaiveDate,
    daily_budget: i64,
    daily_saving: i64,
) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO budgets \
         (user_id, account_id, daily_budget, initial_daily_budget, daily_saving, budget_date) \
         VALUES (?, ?, ?, ?, ?, ?)",
        vec![
            "alice".into(),
            account_id.into(),
            daily_budget.into(),
            daily_budget.into(),
            daily_saving.into(),
            date.into(),
        ],
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn first_budget_row_without_history_starts_at_zero_saving() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;

    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(310_000))
        .await
        .unwrap();

    let budget = written.budget.unwrap();
    let expected = Money::new(310_000).div_round_half_up(days_in_month(today()));
    assert!(!budget.degraded);
    assert_eq!(budget.daily_budget, expected.rupiah());
    assert_eq!(budget.initial_daily_budget, expected.rupiah());
    assert_eq!(budget.daily_saving, 0);
}

#[tokio::test]
async fn carry_forward_adds_yesterdays_leftover() {
    let (engine, db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;

    let yesterday = today() - Duration::days(1);
    insert_budget_row(&db, account_id, yesterday, 100_000, 5_000).await;

    engine
        .record_expense(
            "alice",
            account_id,
            Money::new(50_000),
            "makan",
            None,
            Some(yesterday),
        )
        .await
        .unwrap();
    engine
        .record_expense(
            "alice",
            account_id,
            Money::new(20_000),
            "transport",
            None,
            Some(yesterday),
        )
        .await
        .unwrap();

    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(150_000))
        .await
        .unwrap();

    let budget = written.budget.unwrap();
    // 5_000 carried + max(0, 100_000 - 70_000) left over yesterday.
    assert_eq!(budget.daily_saving, 35_000);
    let expected = Money::new(150_000).div_round_half_up(days_in_month(today()));
    assert_eq!(budget.daily_budget, expected.rupiah());
}

#[tokio::test]
async fn overspent_yesterday_carries_nothing_extra() {
    let (engine, db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;

    let yesterday = today() - Duration::days(1);
    insert_budget_row(&db, account_id, yesterday, 30_000, 2_000).await;
    engine
        .record_expense(
            "alice",
            account_id,
            Money::new(45_000),
            "makan",
            None,
            Some(yesterday),
        )
        .await
        .unwrap();

    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(90_000))
        .await
        .unwrap();

    // The leftover clamps at zero; earlier savings survive.
    assert_eq!(written.budget.unwrap().daily_saving, 2_000);
}

#[tokio::test]
async fn same_day_retrigger_keeps_accrued_saving() {
    let (engine, db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;

    let yesterday = today() - Duration::days(1);
    insert_budget_row(&db, account_id, yesterday, 100_000, 5_000).await;

    engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(150_000))
        .await
        .unwrap();
    let retriggered = engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(300_000))
        .await
        .unwrap();

    let budget = retriggered.budget.unwrap();
    let expected = Money::new(300_000).div_round_half_up(days_in_month(today()));
    assert_eq!(budget.daily_budget, expected.rupiah());
    // Savings accrued earlier today are not forfeited by the re-trigger.
    assert_eq!(budget.daily_saving, 105_000);
}

#[tokio::test]
async fn non_kebutuhan_updates_do_not_touch_the_budget() {
    let (engine, db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;

    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Tabungan, Money::new(50_000))
        .await
        .unwrap();
    assert!(written.budget.is_none());

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) AS total FROM budgets".to_string(),
        ))
        .await
        .unwrap()
        .unwrap();
    let total: i64 = row.try_get("", "total").unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn todays_expense_decrements_the_allowance() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;

    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(310_000))
        .await
        .unwrap();
    let initial = written.budget.unwrap().initial_daily_budget;

    let recorded = engine
        .record_expense("alice", account_id, Money::new(5_000), "kopi", None, None)
        .await
        .unwrap();

    let budget = recorded.budget.unwrap();
    assert_eq!(budget.daily_budget, initial - 5_000);
    assert_eq!(budget.initial_daily_budget, initial);
}

#[tokio::test]
async fn monthly_obligations_shrink_the_daily_base() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;

    engine
        .add_monthly_expense("alice", "Kos", Money::new(60_000))
        .await
        .unwrap();

    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(200_000))
        .await
        .unwrap();
    let expected = Money::new(140_000).div_round_half_up(days_in_month(today()));
    assert_eq!(written.budget.unwrap().daily_budget, expected.rupiah());

    // Obligations above the bucket clamp the base at zero.
    engine
        .add_monthly_expense("alice", "Cicilan", Money::new(500_000))
        .await
        .unwrap();
    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(210_000))
        .await
        .unwrap();
    assert_eq!(written.budget.unwrap().daily_budget, 0);
}

#[tokio::test]
async fn daily_budget_today_materializes_the_row() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_buckets(&engine).await;
    engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(62_000))
        .await
        .unwrap();

    let snapshot = engine.daily_budget_today("alice", account_id).await.unwrap();
    let expected = Money::new(62_000).div_round_half_up(days_in_month(today()));
    assert_eq!(snapshot.daily_budget, expected.rupiah());
    assert!(!snapshot.degraded);
}
