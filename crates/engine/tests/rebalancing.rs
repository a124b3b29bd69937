use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{AllocationChange, AllocationKind, Engine, EngineError, Money};
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

async fn count(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS total FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "total").unwrap()
}

/// Creates the canonical two-account layout: account #1 holding Kebutuhan,
/// account #2 holding Tabungan (funded) and Darurat (zero).
async fn two_account_user(engine: &Engine) -> (i32, i32) {
    let first = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap();
    let first_id = first.account.id;
    engine
        .update_account_balance("alice", first_id, AllocationKind::Kebutuhan, Money::new(80_000))
        .await
        .unwrap();

    let second = engine
        .add_account("alice", 2, AllocationKind::Tabungan, Money::new(50_000))
        .await
        .unwrap();
    (first_id, second.account.id)
}

#[tokio::test]
async fn first_account_gets_three_zero_buckets_and_no_budget_row() {
    let (engine, db) = engine_with_db().await;

    let created = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap();

    assert_eq!(created.total_accounts, 1);
    assert!(!created.message.is_empty());
    assert_eq!(created.account.allocations.len(), 3);
    assert!(created
        .account
        .allocations
        .iter()
        .all(|a| a.balance == Money::ZERO));
    assert_eq!(created.account.current_balance, Money::ZERO);

    // Unfunded buckets do not start budget tracking.
    assert!(created.budget.is_none());
    assert_eq!(count(&db, "budgets").await, 0);
}

#[tokio::test]
async fn single_account_balance_excludes_darurat() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap();
    let account_id = created.account.id;

    engine
        .update_account_balance("alice", account_id, AllocationKind::Kebutuhan, Money::new(100_000))
        .await
        .unwrap();
    engine
        .update_account_balance("alice", account_id, AllocationKind::Tabungan, Money::new(50_000))
        .await
        .unwrap();
    let written = engine
        .update_account_balance("alice", account_id, AllocationKind::Darurat, Money::new(30_000))
        .await
        .unwrap();

    assert_eq!(written.account_balance, Money::new(150_000));

    let snapshot = engine.accounts_snapshot("alice").await.unwrap();
    assert_eq!(snapshot.accounts[0].current_balance, Money::new(150_000));
}

#[tokio::test]
async fn second_account_strips_savings_from_first() {
    let (engine, _db) = engine_with_db().await;
    let (first_id, second_id) = two_account_user(&engine).await;

    let snapshot = engine.accounts_snapshot("alice").await.unwrap();
    assert_eq!(snapshot.accounts.len(), 2);

    let first = &snapshot.accounts[0];
    assert_eq!(first.id, first_id);
    assert_eq!(first.allocations.len(), 1);
    assert_eq!(first.allocations[0].kind, AllocationKind::Kebutuhan);
    // Oldest account counts Kebutuhan alone.
    assert_eq!(first.current_balance, Money::new(80_000));

    let second = &snapshot.accounts[1];
    assert_eq!(second.id, second_id);
    let tabungan = second
        .allocations
        .iter()
        .find(|a| a.kind == AllocationKind::Tabungan)
        .unwrap();
    let darurat = second
        .allocations
        .iter()
        .find(|a| a.kind == AllocationKind::Darurat)
        .unwrap();
    assert_eq!(tabungan.balance, Money::new(50_000));
    assert_eq!(darurat.balance, Money::ZERO);
    assert_eq!(second.current_balance, Money::new(50_000));
}

#[tokio::test]
async fn second_account_kebutuhan_is_rejected_without_side_effects() {
    let (engine, db) = engine_with_db().await;
    engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap();

    let accounts_before = count(&db, "accounts").await;
    let allocations_before = count(&db, "account_allocations").await;

    let err = engine
        .add_account("alice", 2, AllocationKind::Kebutuhan, Money::new(10_000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PolicyViolation(_)));

    assert_eq!(count(&db, "accounts").await, accounts_before);
    assert_eq!(count(&db, "account_allocations").await, allocations_before);
}

#[tokio::test]
async fn third_account_takes_darurat_from_second() {
    let (engine, _db) = engine_with_db().await;
    let (_, second_id) = two_account_user(&engine).await;
    engine
        .update_account_balance("alice", second_id, AllocationKind::Darurat, Money::new(10_000))
        .await
        .unwrap();

    let created = engine
        .add_account("alice", 3, AllocationKind::Darurat, Money::new(20_000))
        .await
        .unwrap();
    assert_eq!(created.total_accounts, 3);
    assert_eq!(created.account.allocations.len(), 1);
    assert_eq!(created.account.allocations[0].kind, AllocationKind::Darurat);
    assert_eq!(created.account.current_balance, Money::new(20_000));

    let second = created
        .accounts
        .iter()
        .find(|a| a.id == second_id)
        .unwrap();
    assert!(second
        .allocations
        .iter()
        .all(|a| a.kind != AllocationKind::Darurat));
    // Second account keeps Tabungan only.
    assert_eq!(second.current_balance, Money::new(50_000));
}

#[tokio::test]
async fn third_account_rejects_kebutuhan_and_tabungan() {
    let (engine, db) = engine_with_db().await;
    two_account_user(&engine).await;

    let allocations_before = count(&db, "account_allocations").await;

    for kind in [AllocationKind::Kebutuhan, AllocationKind::Tabungan] {
        let err = engine
            .add_account("alice", 3, kind, Money::new(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PolicyViolation(_)));
    }

    assert_eq!(count(&db, "accounts").await, 2);
    assert_eq!(count(&db, "account_allocations").await, allocations_before);
}

#[tokio::test]
async fn three_plus_accounts_sum_their_own_buckets() {
    let (engine, _db) = engine_with_db().await;
    let (first_id, second_id) = two_account_user(&engine).await;
    let third = engine
        .add_account("alice", 3, AllocationKind::Darurat, Money::new(20_000))
        .await
        .unwrap();

    // At three accounts any kind may be added anywhere.
    engine
        .update_account_balance("alice", first_id, AllocationKind::Tabungan, Money::new(5_000))
        .await
        .unwrap();

    let snapshot = engine.accounts_snapshot("alice").await.unwrap();
    for account in &snapshot.accounts {
        let sum = account
            .allocations
            .iter()
            .fold(Money::ZERO, |acc, a| acc + a.balance);
        assert_eq!(account.current_balance, sum, "account {}", account.id);
    }

    let first = snapshot.accounts.iter().find(|a| a.id == first_id).unwrap();
    assert_eq!(first.current_balance, Money::new(85_000));
    let second = snapshot.accounts.iter().find(|a| a.id == second_id).unwrap();
    assert_eq!(second.current_balance, Money::new(50_000));
    let third_snap = snapshot
        .accounts
        .iter()
        .find(|a| a.id == third.account.id)
        .unwrap();
    assert_eq!(third_snap.current_balance, Money::new(20_000));
}

#[tokio::test]
async fn swap_moves_bucket_across_accounts() {
    let (engine, _db) = engine_with_db().await;
    let (first_id, second_id) = two_account_user(&engine).await;

    let snapshot = engine.accounts_snapshot("alice").await.unwrap();
    let second = snapshot.accounts.iter().find(|a| a.id == second_id).unwrap();
    let tabungan_id = second
        .allocations
        .iter()
        .find(|a| a.kind == AllocationKind::Tabungan)
        .unwrap()
        .id;

    let written = engine
        .update_allocation("alice", tabungan_id, Some(AllocationKind::Kebutuhan), None)
        .await
        .unwrap();

    let AllocationChange::Swapped { counterpart_id } = written.change else {
        panic!("expected a swap, got {:?}", written.change);
    };

    // The addressed row took over the Kebutuhan bucket on the first account.
    assert_eq!(written.allocation.kind, AllocationKind::Kebutuhan);
    assert_eq!(written.allocation.account_id, first_id);
    assert_eq!(written.allocation.balance, Money::new(80_000));

    // The counterpart carried Tabungan (and its money) to the second account.
    let counterpart = written
        .accounts
        .iter()
        .flat_map(|a| a.allocations.iter())
        .find(|a| a.id == counterpart_id)
        .unwrap();
    assert_eq!(counterpart.kind, AllocationKind::Tabungan);
    assert_eq!(counterpart.account_id, second_id);
    assert_eq!(counterpart.balance, Money::new(50_000));

    // After a manual swap every account is a plain sum of its own buckets.
    for account in &written.accounts {
        let sum = account
            .allocations
            .iter()
            .fold(Money::ZERO, |acc, a| acc + a.balance);
        assert_eq!(account.current_balance, sum, "account {}", account.id);
    }

    // Kebutuhan moved, so budget tracking must have refreshed.
    assert!(written.budget.is_some());
}

#[tokio::test]
async fn swapping_back_restores_both_rows() {
    let (engine, _db) = engine_with_db().await;
    let (_, second_id) = two_account_user(&engine).await;

    let snapshot = engine.accounts_snapshot("alice").await.unwrap();
    let original: Vec<_> = snapshot
        .accounts
        .iter()
        .flat_map(|a| a.allocations.iter().cloned())
        .collect();
    let tabungan_id = original
        .iter()
        .find(|a| a.kind == AllocationKind::Tabungan && a.account_id == second_id)
        .unwrap()
        .id;

    engine
        .update_allocation("alice", tabungan_id, Some(AllocationKind::Kebutuhan), None)
        .await
        .unwrap();
    engine
        .update_allocation("alice", tabungan_id, Some(AllocationKind::Tabungan), None)
        .await
        .unwrap();

    let restored = engine.accounts_snapshot("alice").await.unwrap();
    let mut after: Vec<_> = restored
        .accounts
        .iter()
        .flat_map(|a| a.allocations.iter().cloned())
        .collect();
    after.sort_by_key(|a| a.id);
    let mut before = original.clone();
    before.sort_by_key(|a| a.id);

    for (was, is) in before.iter().zip(after.iter()) {
        assert_eq!(was.id, is.id);
        assert_eq!(was.kind, is.kind);
        assert_eq!(was.balance, is.balance);
        assert_eq!(was.account_id, is.account_id);
    }
}

#[tokio::test]
async fn relabel_when_requested_kind_is_absent() {
    let (engine, db) = engine_with_db().await;
    let (first_id, _) = two_account_user(&engine).await;
    let third = engine
        .add_account("alice", 3, AllocationKind::Darurat, Money::new(20_000))
        .await
        .unwrap();

    // Orphan the Kebutuhan kind to exercise the relabel path.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "DELETE FROM account_allocations WHERE account_id = ? AND kind = ?",
        vec![first_id.into(), "Kebutuhan".into()],
    ))
    .await
    .unwrap();

    let darurat_id = third.account.allocations[0].id;
    let written = engine
        .update_allocation("alice", darurat_id, Some(AllocationKind::Kebutuhan), None)
        .await
        .unwrap();

    assert_eq!(written.change, AllocationChange::Relabelled);
    assert_eq!(written.allocation.kind, AllocationKind::Kebutuhan);
    // A relabel keeps the row where it was, money included.
    assert_eq!(written.allocation.account_id, third.account.id);
    assert_eq!(written.allocation.balance, Money::new(20_000));
    assert!(written.budget.is_some());
}

#[tokio::test]
async fn noop_update_is_detected_and_writes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let (first_id, _) = two_account_user(&engine).await;

    let snapshot = engine.accounts_snapshot("alice").await.unwrap();
    let first = snapshot.accounts.iter().find(|a| a.id == first_id).unwrap();
    let kebutuhan = &first.allocations[0];

    let written = engine
        .update_allocation(
            "alice",
            kebutuhan.id,
            Some(AllocationKind::Kebutuhan),
            Some(Money::new(80_000)),
        )
        .await
        .unwrap();

    assert_eq!(written.change, AllocationChange::NoOp);
    assert!(written.budget.is_none());

    let after = engine.accounts_snapshot("alice").await.unwrap();
    let first_after = after.accounts.iter().find(|a| a.id == first_id).unwrap();
    assert_eq!(first_after.allocations[0].balance, Money::new(80_000));
    assert_eq!(first_after.current_balance, first.current_balance);
}

#[tokio::test]
async fn update_without_changes_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .update_allocation("alice", 1, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn negative_balances_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap();

    let err = engine
        .add_account("alice", 2, AllocationKind::Tabungan, Money::new(-1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .update_account_balance(
            "alice",
            created.account.id,
            AllocationKind::Kebutuhan,
            Money::new(-500),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn unknown_bank_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .add_account("alice", 999, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn foreign_allocation_is_forbidden() {
    let (engine, db) = engine_with_db().await;
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["mallory".into(), "password".into()],
    ))
    .await
    .unwrap();

    let created = engine
        .add_account("alice", 1, AllocationKind::Kebutuhan, Money::ZERO)
        .await
        .unwrap();
    let allocation_id = created.account.allocations[0].id;

    let err = engine
        .update_allocation(
            "mallory",
            allocation_id,
            Some(AllocationKind::Tabungan),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .update_account_balance(
            "mallory",
            created.account.id,
            AllocationKind::Kebutuhan,
            Money::new(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn bank_catalog_lookup_is_accent_and_case_insensitive() {
    let (engine, _db) = engine_with_db().await;
    let bca = engine.bank_by_name("  bca ").await.unwrap();
    assert_eq!(bca.name, "BCA");
    let mandiri = engine.bank_by_name("BANK MANDIRI").await.unwrap();
    assert_eq!(mandiri.name, "Bank Mandiri");
    assert!(engine.bank_by_name("no such bank").await.is_err());
}
