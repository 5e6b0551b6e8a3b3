//! Environment-driven runtime configuration.
//!
//! All settings are read from `LEDGER_`-prefixed environment variables
//! (optionally loaded from a `.env` file), e.g. `LEDGER_DATABASE_URL` or
//! `LEDGER_PROFIT_LOSS_ACCOUNT`. Posting and closing account mappings are
//! configuration rather than constants so deployments can point them at
//! their own chart of accounts.

use config::{Config, ConfigError, Environment};
use core_kernel::AccountId;
use domain_documents::PostingAccounts;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Postgres connection string.
    pub database_url: String,

    /// Accounts-receivable account debited when posting invoices.
    pub receivable_account: Uuid,
    /// Revenue account credited when posting invoices.
    pub revenue_account: Uuid,
    /// Expense account debited when posting purchase bills.
    pub expense_account: Uuid,
    /// Accounts-payable account credited when posting purchase bills.
    pub payable_account: Uuid,
    /// Equity account receiving the net result of a period close.
    pub profit_loss_account: Uuid,

    #[serde(default = "default_max_connections")]
    pub max_db_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl LedgerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value fails to parse (for example a malformed account UUID).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Config::builder()
            .add_source(Environment::with_prefix("LEDGER"))
            .build()?
            .try_deserialize()
    }

    /// Account mapping used by the document posting workflow.
    pub fn posting_accounts(&self) -> PostingAccounts {
        PostingAccounts {
            receivable: AccountId::from_uuid(self.receivable_account),
            revenue: AccountId::from_uuid(self.revenue_account),
            expense: AccountId::from_uuid(self.expense_account),
            payable: AccountId::from_uuid(self.payable_account),
        }
    }

    /// Target account for period-closing transfers.
    pub fn profit_loss(&self) -> AccountId {
        AccountId::from_uuid(self.profit_loss_account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_accounts_round_trip() {
        let config = LedgerConfig {
            database_url: "postgres://localhost/ledger".into(),
            receivable_account: Uuid::new_v4(),
            revenue_account: Uuid::new_v4(),
            expense_account: Uuid::new_v4(),
            payable_account: Uuid::new_v4(),
            profit_loss_account: Uuid::new_v4(),
            max_db_connections: default_max_connections(),
        };
        let accounts = config.posting_accounts();
        assert_eq!(accounts.receivable.as_uuid(), &config.receivable_account);
        assert_eq!(accounts.payable.as_uuid(), &config.payable_account);
        assert_eq!(config.profit_loss().as_uuid(), &config.profit_loss_account);
    }
}
