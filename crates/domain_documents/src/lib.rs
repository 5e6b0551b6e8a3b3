//! Documents Domain - Business Document Posting
//!
//! Invoices and purchase bills are business documents that, once confirmed,
//! are posted into exactly one immutable accounting transaction:
//!
//! - Invoice: debit accounts receivable, credit revenue
//! - Purchase bill: debit expense/COGS, credit accounts payable
//!
//! Posting is exactly-once: the document's posted-transaction reference is
//! set in the same atomic unit as the transaction and its splits, and a
//! second attempt is rejected with [`PostingError::AlreadyPosted`].
//!
//! Account mapping is injected configuration ([`PostingAccounts`]), never
//! literals baked into the workflow.

pub mod bill;
pub mod error;
pub mod invoice;
pub mod ports;
pub mod posting;
pub mod service;
pub mod status;

pub use bill::PurchaseBill;
pub use error::PostingError;
pub use invoice::{Invoice, InvoiceEntry};
pub use ports::{DocumentStore, PostingLedger};
pub use posting::{
    build_posting_transaction, DocumentRef, DocumentType, ParseDocumentTypeError,
    PostableDocument, PostingAccounts,
};
pub use service::{DocumentPostingService, PostingReceipt};
pub use status::{DocumentStatus, ParseDocumentStatusError};
