//! Posting computation
//!
//! Turns a postable document into a balanced transaction batch using the
//! injected chart-of-accounts mapping. Pure computation; persistence happens
//! behind the [`crate::ports::PostingLedger`] seam.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use core_kernel::AccountId;
use domain_ledger::{NewSplit, NewTransaction};

use crate::error::PostingError;
use crate::status::DocumentStatus;

/// The kind of business document being posted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    PurchaseBill,
}

impl DocumentType {
    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::PurchaseBill => "purchase_bill",
        }
    }

    /// Human-readable label used in transaction descriptions
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "Invoice",
            DocumentType::PurchaseBill => "Purchase bill",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown document type string
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown document type: {0}")]
pub struct ParseDocumentTypeError(pub String);

impl FromStr for DocumentType {
    type Err = ParseDocumentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice" => Ok(DocumentType::Invoice),
            "purchase_bill" => Ok(DocumentType::PurchaseBill),
            other => Err(ParseDocumentTypeError(other.to_string())),
        }
    }
}

/// Type-tagged reference to a business document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_type: DocumentType,
    pub guid: Uuid,
}

impl DocumentRef {
    pub fn invoice(guid: Uuid) -> Self {
        Self { document_type: DocumentType::Invoice, guid }
    }

    pub fn purchase_bill(guid: Uuid) -> Self {
        Self { document_type: DocumentType::PurchaseBill, guid }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.document_type, self.guid)
    }
}

/// Chart-of-accounts mapping for document posting
///
/// Resolved from configuration at startup; the workflow never hardcodes
/// account guids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PostingAccounts {
    /// Accounts receivable (debited when an invoice posts)
    pub receivable: AccountId,
    /// Revenue (credited when an invoice posts)
    pub revenue: AccountId,
    /// Expense / cost of goods sold (debited when a bill posts)
    pub expense: AccountId,
    /// Accounts payable (credited when a bill posts)
    pub payable: AccountId,
}

/// The projection of a document the posting workflow needs
///
/// Adapters build this from their storage rows; the workflow itself never
/// touches entity internals beyond this view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostableDocument {
    /// Which document this is
    pub doc: DocumentRef,
    /// Business-facing number (invoice number, bill number)
    pub number: String,
    /// Counterparty label for split memos
    pub counterparty: String,
    /// Total amount to post
    pub total: Decimal,
    /// Accounting effective date
    pub post_date: DateTime<Utc>,
    /// Recorded date
    pub enter_date: DateTime<Utc>,
    /// Lifecycle state
    pub status: DocumentStatus,
    /// Posted-transaction reference, if already set
    pub post_txn: Option<core_kernel::TransactionId>,
}

/// Builds the balanced transaction for a document posting
///
/// - Invoice: debit receivable `+total`, credit revenue `-total`
/// - Purchase bill: debit expense `+total`, credit payable `-total`
///
/// # Errors
///
/// [`PostingError::Business`] for a non-positive total or if the computed
/// batch fails zero-sum validation.
pub fn build_posting_transaction(
    document: &PostableDocument,
    accounts: &PostingAccounts,
) -> Result<NewTransaction, PostingError> {
    if document.total <= Decimal::ZERO {
        return Err(PostingError::Business(format!(
            "{} {} has a non-positive total {}",
            document.doc.document_type.label(),
            document.number,
            document.total
        )));
    }

    let description = format!(
        "{} {} posted",
        document.doc.document_type.label(),
        document.number
    );

    let txn = match document.doc.document_type {
        DocumentType::Invoice => NewTransaction::new(description)
            .posted_at(document.post_date)
            .entered_at(document.enter_date)
            .split(
                NewSplit::debit(accounts.receivable, document.total)
                    .with_memo(format!("Invoice {} receivable", document.number)),
            )
            .split(
                NewSplit::credit(accounts.revenue, document.total)
                    .with_memo(format!("Invoice {} revenue recognition", document.number)),
            ),
        DocumentType::PurchaseBill => NewTransaction::new(description)
            .posted_at(document.post_date)
            .entered_at(document.enter_date)
            .split(
                NewSplit::debit(accounts.expense, document.total)
                    .with_memo(format!("Bill {} cost recognition", document.number)),
            )
            .split(
                NewSplit::credit(accounts.payable, document.total)
                    .with_memo(format!("Payable to {}", document.counterparty)),
            ),
    };

    txn.validate()?;
    Ok(txn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mapping() -> PostingAccounts {
        PostingAccounts {
            receivable: AccountId::new(),
            revenue: AccountId::new(),
            expense: AccountId::new(),
            payable: AccountId::new(),
        }
    }

    fn invoice_doc(total: Decimal) -> PostableDocument {
        PostableDocument {
            doc: DocumentRef::invoice(Uuid::new_v4()),
            number: "INV-2024-001".to_string(),
            counterparty: "Acme Networks Ltd".to_string(),
            total,
            post_date: Utc::now(),
            enter_date: Utc::now(),
            status: DocumentStatus::Confirmed,
            post_txn: None,
        }
    }

    #[test]
    fn test_invoice_legs() {
        let accounts = mapping();
        let txn = build_posting_transaction(&invoice_doc(dec!(500.00)), &accounts).unwrap();

        assert_eq!(txn.splits.len(), 2);
        let debit = txn.splits.iter().find(|s| s.account_guid == accounts.receivable).unwrap();
        let credit = txn.splits.iter().find(|s| s.account_guid == accounts.revenue).unwrap();
        assert_eq!(debit.value, dec!(500.00));
        assert_eq!(credit.value, dec!(-500.00));
        assert!(txn.is_balanced());
    }

    #[test]
    fn test_bill_legs() {
        let accounts = mapping();
        let mut doc = invoice_doc(dec!(820.40));
        doc.doc = DocumentRef::purchase_bill(Uuid::new_v4());
        doc.number = "BILL-2024-010".to_string();

        let txn = build_posting_transaction(&doc, &accounts).unwrap();
        let debit = txn.splits.iter().find(|s| s.account_guid == accounts.expense).unwrap();
        let credit = txn.splits.iter().find(|s| s.account_guid == accounts.payable).unwrap();
        assert_eq!(debit.value, dec!(820.40));
        assert_eq!(credit.value, dec!(-820.40));
        assert!(credit.memo.as_deref().unwrap().contains("Acme Networks"));
    }

    #[test]
    fn test_non_positive_total_rejected() {
        let result = build_posting_transaction(&invoice_doc(dec!(0)), &mapping());
        assert!(matches!(result, Err(PostingError::Business(_))));
    }
}
