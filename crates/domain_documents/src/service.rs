//! The document posting workflow

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use core_kernel::TransactionId;

use crate::error::PostingError;
use crate::ports::{DocumentStore, PostingLedger};
use crate::posting::{build_posting_transaction, DocumentRef, PostingAccounts};

/// Outcome of a successful posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingReceipt {
    pub document: DocumentRef,
    pub transaction: TransactionId,
    pub message: String,
}

/// Converts confirmed business documents into posted transactions
///
/// The workflow is exactly-once per document: the posted-transaction
/// reference is written in the same atomic unit as the transaction and its
/// splits, and any failure rolls the whole attempt back.
pub struct DocumentPostingService {
    documents: Arc<dyn DocumentStore>,
    ledger: Arc<dyn PostingLedger>,
    accounts: PostingAccounts,
}

impl DocumentPostingService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        ledger: Arc<dyn PostingLedger>,
        accounts: PostingAccounts,
    ) -> Self {
        Self { documents, ledger, accounts }
    }

    /// Posts a document into exactly one accounting transaction
    ///
    /// # Errors
    ///
    /// - [`PostingError::NotFound`] if the document does not exist
    /// - [`PostingError::AlreadyPosted`] if its posted-transaction reference
    ///   is already set (including a lost race with a concurrent poster)
    /// - [`PostingError::Business`] for cancelled documents or invalid totals
    /// - [`PostingError::Storage`] for transient failures; nothing partial
    ///   persists, so the whole call is safe to retry
    pub async fn post_document(&self, doc: DocumentRef) -> Result<PostingReceipt, PostingError> {
        let document = self
            .documents
            .fetch(doc)
            .await?
            .ok_or_else(|| PostingError::NotFound(doc.to_string()))?;

        if document.post_txn.is_some() {
            warn!(document = %doc, "rejecting duplicate posting attempt");
            return Err(PostingError::AlreadyPosted(format!(
                "{} {} is already posted",
                doc.document_type.label(),
                document.number
            )));
        }
        if !document.status.can_post() {
            return Err(PostingError::Business(format!(
                "{} {} is {} and cannot be posted",
                doc.document_type.label(),
                document.number,
                document.status
            )));
        }

        let txn = build_posting_transaction(&document, &self.accounts)?;
        let txn_guid = txn.guid;

        let transaction = self.ledger.commit_posting(doc, txn).await?;
        info!(document = %doc, transaction = %txn_guid, "document posted");

        Ok(PostingReceipt {
            document: doc,
            transaction,
            message: format!(
                "{} {} posted successfully",
                doc.document_type.label(),
                document.number
            ),
        })
    }
}
