//! In-memory port adapter
//!
//! One store implements every domain port so service-level tests can run a
//! whole workflow without a database. Mutations take the same all-or-nothing
//! shape as the PostgreSQL adapters: every check happens before the first
//! write, and an injected fault leaves no partial state behind.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::{AccountId, ClosingTaskId, TransactionId};
use domain_closing::task::{ClosingStatus, ClosingTask};
use domain_closing::{ClosingError, ClosingStore};
use domain_documents::posting::{DocumentRef, PostableDocument};
use domain_documents::{DocumentStatus, DocumentStore, PostingError, PostingLedger};
use domain_ledger::{
    compute_balance, Account, AccountSource, AccountType, BalanceQuery, LedgerError,
    NewTransaction, Split, SplitView, Transaction, TransactionWriter,
};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    documents: HashMap<DocumentRef, PostableDocument>,
    tasks: HashMap<ClosingTaskId, ClosingTask>,
    fail_next_write: bool,
}

/// In-memory implementation of all five domain ports.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<State>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account.
    pub fn add_account(&self, account: Account) -> AccountId {
        let guid = account.guid;
        self.state.lock().unwrap().accounts.insert(guid, account);
        guid
    }

    /// Creates the ROOT account, enforcing the single-root invariant the
    /// database schema carries as a partial unique index.
    pub fn ensure_root(&self) -> Result<AccountId, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state
            .accounts
            .values()
            .any(|a| a.account_type == AccountType::Root)
        {
            return Err(LedgerError::conflict("a root account already exists"));
        }
        let root = Account::root();
        let guid = root.guid;
        state.accounts.insert(guid, root);
        Ok(guid)
    }

    /// Registers a postable document projection.
    pub fn add_document(&self, document: PostableDocument) {
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(document.doc, document);
    }

    /// Makes the next mutating ledger write fail with a storage error,
    /// leaving no partial state.
    pub fn fail_next_write(&self) {
        self.state.lock().unwrap().fail_next_write = true;
    }

    /// Snapshot of all persisted transactions.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().transactions.values().cloned().collect()
    }

    /// Fetches a document projection.
    pub fn document(&self, doc: DocumentRef) -> Option<PostableDocument> {
        self.state.lock().unwrap().documents.get(&doc).cloned()
    }

    /// Fetches a closing task.
    pub fn task(&self, guid: ClosingTaskId) -> Option<ClosingTask> {
        self.state.lock().unwrap().tasks.get(&guid).cloned()
    }

    fn consume_fault(state: &mut State) -> bool {
        std::mem::take(&mut state.fail_next_write)
    }

    /// Validates the batch against the stored chart and materializes it.
    /// Performs every check before touching `state.transactions`.
    fn insert_transaction(state: &mut State, txn: &NewTransaction) -> Result<(), LedgerError> {
        txn.validate()?;

        for split in &txn.splits {
            let account = state
                .accounts
                .get(&split.account_guid)
                .ok_or_else(|| LedgerError::Referential(format!(
                    "split references missing account {}",
                    split.account_guid
                )))?;
            if account.placeholder {
                return Err(LedgerError::Validation(format!(
                    "account {} is a placeholder and cannot hold splits",
                    account.guid
                )));
            }
        }

        let splits = txn
            .splits
            .iter()
            .map(|s| Split {
                guid: s.guid,
                txn_guid: txn.guid,
                account_guid: s.account_guid,
                value: core_kernel::round_amount(s.value),
                quantity: s.quantity,
                memo: s.memo.clone(),
                reconcile_state: 'n',
                reconcile_date: None,
            })
            .collect();

        state.transactions.insert(
            txn.guid,
            Transaction {
                guid: txn.guid,
                post_date: txn.post_date,
                enter_date: txn.enter_date,
                description: txn.description.clone(),
                kind: txn.kind,
                splits,
            },
        );
        Ok(())
    }

    fn splits_for(state: &State, guid: AccountId) -> Vec<SplitView> {
        state
            .transactions
            .values()
            .flat_map(|t| {
                t.splits
                    .iter()
                    .filter(|s| s.account_guid == guid)
                    .map(|s| SplitView {
                        value: s.value,
                        post_date: t.post_date,
                        kind: t.kind,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[async_trait]
impl AccountSource for InMemoryLedger {
    async fn account(&self, guid: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.state.lock().unwrap().accounts.get(&guid).cloned())
    }

    async fn accounts_by_type(&self, types: &[AccountType]) -> Result<Vec<Account>, LedgerError> {
        let state = self.state.lock().unwrap();
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| types.contains(&a.account_type))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn balance(&self, guid: AccountId, query: BalanceQuery) -> Result<Decimal, LedgerError> {
        let state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get(&guid)
            .ok_or_else(|| LedgerError::AccountNotFound(guid.to_string()))?;
        let splits = Self::splits_for(&state, guid);
        Ok(compute_balance(account.account_type, splits, &query))
    }
}

#[async_trait]
impl TransactionWriter for InMemoryLedger {
    async fn create_transaction(&self, txn: NewTransaction) -> Result<TransactionId, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if Self::consume_fault(&mut state) {
            return Err(LedgerError::storage("injected write failure"));
        }
        Self::insert_transaction(&mut state, &txn)?;
        Ok(txn.guid)
    }
}

#[async_trait]
impl DocumentStore for InMemoryLedger {
    async fn fetch(&self, doc: DocumentRef) -> Result<Option<PostableDocument>, PostingError> {
        Ok(self.state.lock().unwrap().documents.get(&doc).cloned())
    }
}

#[async_trait]
impl PostingLedger for InMemoryLedger {
    async fn commit_posting(
        &self,
        doc: DocumentRef,
        txn: NewTransaction,
    ) -> Result<TransactionId, PostingError> {
        let mut state = self.state.lock().unwrap();
        if Self::consume_fault(&mut state) {
            return Err(PostingError::Storage("injected write failure".into()));
        }

        let document = state
            .documents
            .get(&doc)
            .ok_or_else(|| PostingError::NotFound(doc.to_string()))?;
        if document.post_txn.is_some() {
            return Err(PostingError::AlreadyPosted(doc.to_string()));
        }

        Self::insert_transaction(&mut state, &txn)?;
        let document = state.documents.get_mut(&doc).unwrap();
        document.post_txn = Some(txn.guid);
        document.status = DocumentStatus::Posted;
        Ok(txn.guid)
    }
}

#[async_trait]
impl ClosingStore for InMemoryLedger {
    async fn create(&self, task: &ClosingTask) -> Result<(), ClosingError> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .insert(task.guid, task.clone());
        Ok(())
    }

    async fn fetch(&self, guid: ClosingTaskId) -> Result<Option<ClosingTask>, ClosingError> {
        Ok(self.state.lock().unwrap().tasks.get(&guid).cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ClosingTask>, ClosingError> {
        let state = self.state.lock().unwrap();
        let mut tasks: Vec<ClosingTask> = state.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        tasks.truncate(limit as usize);
        Ok(tasks)
    }

    async fn begin_run(&self, guid: ClosingTaskId) -> Result<ClosingTask, ClosingError> {
        let mut state = self.state.lock().unwrap();

        let other_running = state
            .tasks
            .values()
            .any(|t| t.status == ClosingStatus::InProgress && t.guid != guid);
        if other_running {
            return Err(ClosingError::AlreadyRunning);
        }

        let task = state
            .tasks
            .get_mut(&guid)
            .ok_or(ClosingError::TaskNotFound(guid))?;
        task.start()?;
        Ok(task.clone())
    }

    async fn complete(
        &self,
        guid: ClosingTaskId,
        txn: Option<NewTransaction>,
    ) -> Result<Option<TransactionId>, ClosingError> {
        let mut state = self.state.lock().unwrap();
        if Self::consume_fault(&mut state) {
            return Err(ClosingError::Storage("injected write failure".into()));
        }

        if !state.tasks.contains_key(&guid) {
            return Err(ClosingError::TaskNotFound(guid));
        }

        let result_txn = match &txn {
            Some(txn) => {
                Self::insert_transaction(&mut state, txn)?;
                Some(txn.guid)
            }
            None => None,
        };

        let task = state.tasks.get_mut(&guid).unwrap();
        if let Err(err) = task.complete(result_txn) {
            // Roll the ledger write back so failure leaves no partial state.
            if let Some(txn_guid) = result_txn {
                state.transactions.remove(&txn_guid);
            }
            return Err(err);
        }
        Ok(result_txn)
    }

    async fn fail(&self, guid: ClosingTaskId, message: &str) -> Result<(), ClosingError> {
        let mut state = self.state.lock().unwrap();
        let task = state
            .tasks
            .get_mut(&guid)
            .ok_or(ClosingError::TaskNotFound(guid))?;
        task.fail(message)?;
        Ok(())
    }

    async fn fail_stale(&self, started_before: DateTime<Utc>) -> Result<u64, ClosingError> {
        let mut state = self.state.lock().unwrap();
        let mut swept = 0;
        for task in state.tasks.values_mut() {
            let stale = task.status == ClosingStatus::InProgress
                && task.started_at.is_some_and(|at| at < started_before);
            if stale {
                task.fail("closing run abandoned: runner did not finish")?;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_created_exactly_once() {
        let store = InMemoryLedger::new();
        let first = store.ensure_root().unwrap();

        let err = store.ensure_root().unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)), "got {err}");

        let roots: Vec<_> = store
            .state
            .lock()
            .unwrap()
            .accounts
            .values()
            .filter(|a| a.account_type == AccountType::Root)
            .map(|a| a.guid)
            .collect();
        assert_eq!(roots, vec![first]);
    }
}
