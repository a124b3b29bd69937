//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Celengan:
//!
//! - `users`: authentication
//! - `banks`: catalog of banks and e-wallets accounts can attach to
//! - `accounts`: one row per attached bank account
//! - `account_allocations`: budget buckets (Kebutuhan/Tabungan/Darurat)
//! - `budgets`: one daily-allowance row per user/account/day
//! - `expenses`: the spending ledger
//! - `monthly_expenses`: recurring obligations reducing the daily base

use sea_orm::{ConnectionTrait, Statement};
use sea_orm_migration::prelude::*;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Banks {
    Table,
    Id,
    Name,
    NameNorm,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    UserId,
    BankId,
    InitialBalance,
    CurrentBalance,
    CreatedAt,
}

#[derive(Iden)]
enum AccountAllocations {
    Table,
    Id,
    AccountId,
    Kind,
    Balance,
    AllocationDate,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    UserId,
    AccountId,
    DailyBudget,
    InitialDailyBudget,
    DailySaving,
    BudgetDate,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    UserId,
    AccountId,
    Amount,
    Category,
    Note,
    SpentOn,
    CreatedAt,
}

#[derive(Iden)]
enum MonthlyExpenses {
    Table,
    Id,
    UserId,
    Name,
    Amount,
    Active,
}

/// Catalog rows seeded on a fresh database.
const BANK_SEED: [&str; 14] = [
    "BCA",
    "Bank Mandiri",
    "BNI",
    "BRI",
    "CIMB Niaga",
    "Bank Syariah Indonesia",
    "Bank Jago",
    "Jenius",
    "SeaBank",
    "GoPay",
    "OVO",
    "DANA",
    "ShopeePay",
    "LinkAja",
];

fn normalize(value: &str) -> String {
    let stripped: String = value.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Banks
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Banks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Banks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Banks::Name).string().not_null())
                    .col(ColumnDef::new(Banks::NameNorm).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-banks-name_norm-unique")
                    .table(Banks::Table)
                    .col(Banks::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::UserId).string().not_null())
                    .col(ColumnDef::new(Accounts::BankId).integer().not_null())
                    .col(
                        ColumnDef::new(Accounts::InitialBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::CurrentBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-user_id")
                            .from(Accounts::Table, Accounts::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-bank_id")
                            .from(Accounts::Table, Accounts::BankId)
                            .to(Banks::Table, Banks::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Chronological ordering drives the Bank A / Bank B classification.
        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id-created_at")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .col(Accounts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Account allocations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AccountAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountAllocations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccountAllocations::AccountId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountAllocations::Kind).string().not_null())
                    .col(
                        ColumnDef::new(AccountAllocations::Balance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountAllocations::AllocationDate)
                            .date()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-account_allocations-account_id")
                            .from(AccountAllocations::Table, AccountAllocations::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-account_allocations-account_id-kind-unique")
                    .table(AccountAllocations::Table)
                    .col(AccountAllocations::AccountId)
                    .col(AccountAllocations::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Budgets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Budgets::UserId).string().not_null())
                    .col(ColumnDef::new(Budgets::AccountId).integer().not_null())
                    .col(ColumnDef::new(Budgets::DailyBudget).big_integer().not_null())
                    .col(
                        ColumnDef::new(Budgets::InitialDailyBudget)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Budgets::DailySaving).big_integer().not_null())
                    .col(ColumnDef::new(Budgets::BudgetDate).date().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-account_id")
                            .from(Budgets::Table, Budgets::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-user-account-date-unique")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::AccountId)
                    .col(Budgets::BudgetDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::UserId).string().not_null())
                    .col(ColumnDef::new(Expenses::AccountId).integer().not_null())
                    .col(ColumnDef::new(Expenses::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(ColumnDef::new(Expenses::Note).string())
                    .col(ColumnDef::new(Expenses::SpentOn).date().not_null())
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-account_id")
                            .from(Expenses::Table, Expenses::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-user_id-spent_on")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .col(Expenses::SpentOn)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-account_id")
                    .table(Expenses::Table)
                    .col(Expenses::AccountId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Monthly expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(MonthlyExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MonthlyExpenses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MonthlyExpenses::UserId).string().not_null())
                    .col(ColumnDef::new(MonthlyExpenses::Name).string().not_null())
                    .col(
                        ColumnDef::new(MonthlyExpenses::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MonthlyExpenses::Active).boolean().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-monthly_expenses-user_id")
                            .from(MonthlyExpenses::Table, MonthlyExpenses::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-monthly_expenses-user_id")
                    .table(MonthlyExpenses::Table)
                    .col(MonthlyExpenses::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Bank catalog seed
        // ───────────────────────────────────────────────────────────────────
        let db = manager.get_connection();
        let backend = db.get_database_backend();
        for name in BANK_SEED {
            db.execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO banks (name, name_norm) VALUES (?, ?)",
                [name.into(), normalize(name).into()],
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(MonthlyExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Banks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
