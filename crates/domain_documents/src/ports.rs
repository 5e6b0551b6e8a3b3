//! Document posting ports
//!
//! The posting workflow talks to its collaborators through these traits.
//! The production adapters live in `infra_db`; tests use the in-memory
//! adapter from `test_utils`.

use async_trait::async_trait;

use core_kernel::TransactionId;
use domain_ledger::NewTransaction;

use crate::error::PostingError;
use crate::posting::{DocumentRef, PostableDocument};

/// Read access to postable business documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches the posting projection of a document, or `None` if absent
    async fn fetch(&self, doc: DocumentRef) -> Result<Option<PostableDocument>, PostingError>;
}

/// The atomic posting seam
///
/// `commit_posting` must persist the transaction, all of its splits, and the
/// document's posted-transaction reference in one atomic unit. The reference
/// update is conditional on it still being unset, so a concurrent duplicate
/// attempt fails with [`PostingError::AlreadyPosted`] and writes nothing.
#[async_trait]
pub trait PostingLedger: Send + Sync {
    async fn commit_posting(
        &self,
        doc: DocumentRef,
        txn: NewTransaction,
    ) -> Result<TransactionId, PostingError>;
}
