//! Document posting port adapter

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::TransactionId;
use domain_documents::posting::{DocumentRef, PostableDocument};
use domain_documents::{DocumentStore, PostingError, PostingLedger};
use domain_ledger::NewTransaction;

use crate::error::DatabaseError;
use crate::repositories::DocumentRepository;

fn to_posting_error(err: DatabaseError) -> PostingError {
    match err {
        DatabaseError::NotFound(message) => PostingError::NotFound(message),
        DatabaseError::DuplicateEntry(message) => PostingError::AlreadyPosted(message),
        DatabaseError::ForeignKeyViolation(message)
        | DatabaseError::ConstraintViolation(message) => PostingError::Business(message),
        other => PostingError::Storage(other.to_string()),
    }
}

/// [`DocumentStore`] and [`PostingLedger`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgDocumentGateway {
    documents: DocumentRepository,
}

impl PgDocumentGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { documents: DocumentRepository::new(pool) }
    }

    /// Direct repository access for document CRUD outside the posting flow.
    pub fn repository(&self) -> &DocumentRepository {
        &self.documents
    }
}

#[async_trait]
impl DocumentStore for PgDocumentGateway {
    async fn fetch(&self, doc: DocumentRef) -> Result<Option<PostableDocument>, PostingError> {
        self.documents.fetch_postable(doc).await.map_err(to_posting_error)
    }
}

#[async_trait]
impl PostingLedger for PgDocumentGateway {
    async fn commit_posting(
        &self,
        doc: DocumentRef,
        txn: NewTransaction,
    ) -> Result<TransactionId, PostingError> {
        self.documents.commit_posting(doc, &txn).await.map_err(to_posting_error)
    }
}
