//! Canonical test fixtures
//!
//! A small but complete chart of accounts plus ready-made document
//! projections, so service tests spend their lines on behavior instead of
//! setup.

use std::sync::Arc;

use chrono::Utc;
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;
use uuid::Uuid;

use core_kernel::AccountId;
use domain_documents::posting::{DocumentRef, PostableDocument, PostingAccounts};
use domain_documents::DocumentStatus;
use domain_ledger::{Account, AccountType};

use crate::memstore::InMemoryLedger;

/// The standard test chart of accounts.
pub struct StandardChart {
    pub root: AccountId,
    pub bank: AccountId,
    pub receivable: AccountId,
    pub payable: AccountId,
    pub revenue: AccountId,
    pub expense: AccountId,
    pub profit_loss: AccountId,
}

impl StandardChart {
    /// Installs the chart into `store`.
    pub fn install(store: &InMemoryLedger) -> Self {
        let root_guid = store.ensure_root().expect("chart installed twice");

        let add = |name: &str, account_type: AccountType| {
            store.add_account(
                Account::new(AccountId::new(), name, account_type).with_parent(root_guid),
            )
        };

        Self {
            bank: add("Checking Account", AccountType::Bank),
            receivable: add("Accounts Receivable", AccountType::Receivable),
            payable: add("Accounts Payable", AccountType::Payable),
            revenue: add("Sales Revenue", AccountType::Revenue),
            expense: add("Operating Expenses", AccountType::Expense),
            profit_loss: add("Retained Earnings", AccountType::Equity),
            root: root_guid,
        }
    }

    /// The posting mapping used by the document workflow.
    pub fn posting_accounts(&self) -> PostingAccounts {
        PostingAccounts {
            receivable: self.receivable,
            revenue: self.revenue,
            expense: self.expense,
            payable: self.payable,
        }
    }
}

/// A fresh store with the standard chart installed.
pub fn ledger_with_chart() -> (Arc<InMemoryLedger>, StandardChart) {
    let store = Arc::new(InMemoryLedger::new());
    let chart = StandardChart::install(&store);
    (store, chart)
}

/// A confirmed, unposted invoice projection.
pub fn confirmed_invoice(number: &str, total: Decimal) -> PostableDocument {
    let now = Utc::now();
    PostableDocument {
        doc: DocumentRef::invoice(Uuid::new_v4()),
        number: number.to_string(),
        counterparty: CompanyName().fake(),
        total,
        post_date: now,
        enter_date: now,
        status: DocumentStatus::Confirmed,
        post_txn: None,
    }
}

/// A confirmed, unposted purchase bill projection.
pub fn confirmed_bill(number: &str, total: Decimal) -> PostableDocument {
    let now = Utc::now();
    PostableDocument {
        doc: DocumentRef::purchase_bill(Uuid::new_v4()),
        number: number.to_string(),
        counterparty: CompanyName().fake(),
        total,
        post_date: now,
        enter_date: now,
        status: DocumentStatus::Confirmed,
        post_txn: None,
    }
}
