use std::collections::HashSet;

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{AllocationKind, DEFAULT_TIMEZONE, Engine, EngineError, Money};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "mallory"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder().database(db.clone()).build();
    (engine, db)
}

fn today() -> NaiveDate {
    Utc::now().with_timezone(&DEFAULT_TIMEZONE).date_naive()
}

async fn insert_budget_row(
    db: &DatabaseConnection,
    account_id: i32,
    date: NaiveDate,
    daily_budget: i64,
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
            daily_budget.abs().into(),
            0i64.into(),
            date.into(),
        ],
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn goal_progress_tracks_the_tabungan_total() {
    let (engine, _db) = engine_with_db().await;
    let account_id = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap()
        .account
        .id;
    engine
        .update_account_balance("alice", account_id, AllocationKind::Tabungan, Money::new(50_000))
        .await
        .unwrap();

    engine
        .add_goal("alice", "Laptop baru", Money::new(200_000))
        .await
        .unwrap();
    engine
        .add_goal("alice", "Dana liburan", Money::new(50_000))
        .await
        .unwrap();

    let progress = engine.goal_progress("alice").await.unwrap();
    assert_eq!(progress.len(), 2);

    assert_eq!(progress[0].saved, Money::new(50_000));
    assert_eq!(progress[0].percent, 25);
    assert!(!progress[0].reached);

    assert_eq!(progress[1].percent, 100);
    assert!(progress[1].reached);
}

#[tokio::test]
async fn invalid_goal_targets_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .add_goal("alice", "Kosong", Money::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn streak_counts_consecutive_on_budget_days() {
    let (engine, db) = engine_with_db().await;
    let account_id = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap()
        .account
        .id;

    let today = today();
    insert_budget_row(&db, account_id, today, 10_000).await;
    insert_budget_row(&db, account_id, today - Duration::days(1), 500).await;
    // Overspent two days ago: the streak stops there.
    insert_budget_row(&db, account_id, today - Duration::days(2), -300).await;
    insert_budget_row(&db, account_id, today - Duration::days(3), 8_000).await;

    assert_eq!(engine.streak_days("alice").await.unwrap(), 2);
}

#[tokio::test]
async fn badges_are_threshold_counters() {
    let (engine, _db) = engine_with_db().await;

    let before: Vec<_> = engine.badges("alice").await.unwrap();
    assert!(before.iter().all(|b| !b.earned));

    let account_id = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap()
        .account
        .id;
    engine
        .record_expense("alice", account_id, Money::new(2_000), "kopi", None, None)
        .await
        .unwrap();

    let after = engine.badges("alice").await.unwrap();
    let earned: HashSet<&str> = after
        .iter()
        .filter(|b| b.earned)
        .map(|b| b.code)
        .collect();
    assert!(earned.contains("first-account"));
    assert!(earned.contains("first-expense"));
    assert!(!earned.contains("bucket-organizer"));
}

#[tokio::test]
async fn expense_listing_pages_through_everything() {
    let (engine, _db) = engine_with_db().await;
    let account_id = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap()
        .account
        .id;

    let mut recorded = HashSet::new();
    for i in 0..5 {
        let expense = engine
            .record_expense(
                "alice",
                account_id,
                Money::new(1_000 + i),
                "makan",
                None,
                None,
            )
            .await
            .unwrap()
            .expense;
        recorded.insert(expense.id);
    }

    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = engine
            .list_expenses("alice", Some(account_id), 2, cursor.as_deref())
            .await
            .unwrap();
        assert!(page.expenses.len() <= 2);
        for expense in &page.expenses {
            // No duplicates across pages.
            assert!(seen.insert(expense.id));
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(seen, recorded);
}

#[tokio::test]
async fn garbage_cursors_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .list_expenses("alice", None, 10, Some("not-a-cursor"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[tokio::test]
async fn monthly_expenses_are_owned() {
    let (engine, _db) = engine_with_db().await;

    let kos = engine
        .add_monthly_expense("alice", "Kos", Money::new(700_000))
        .await
        .unwrap();
    engine
        .add_monthly_expense("alice", "Internet", Money::new(150_000))
        .await
        .unwrap();

    let err = engine
        .remove_monthly_expense("mallory", kos.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.remove_monthly_expense("alice", kos.id).await.unwrap();
    let remaining = engine.list_monthly_expenses("alice").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Internet");
}
