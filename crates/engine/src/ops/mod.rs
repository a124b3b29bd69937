use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod access;
mod accounts;
mod allocations;
mod balances;
mod budget;
mod expenses;
mod insights;

pub use accounts::{AccountCreated, AccountsSnapshot};
pub use allocations::{AllocationChange, AllocationWrite, BalanceWrite};
pub use budget::DEFAULT_TIMEZONE;
pub use expenses::{ExpenseListPage, ExpenseRecorded};
pub use insights::{Badge, FinanceSummary, GoalProgress};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    timezone: Tz,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The engine's calendar timezone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Today's date in the engine's timezone. All budget rows are keyed on
    /// this calendar, not on UTC.
    pub(crate) fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    timezone: Tz,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            timezone: budget::DEFAULT_TIMEZONE,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the calendar timezone (IANA name already parsed).
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = timezone;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            timezone: self.timezone,
        }
    }
}
