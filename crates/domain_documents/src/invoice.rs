//! Sales invoices

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{round_amount, AccountId, CustomerId, InvoiceId, TransactionId};
use domain_ledger::Quantity;

use crate::status::DocumentStatus;

/// One line item on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceEntry {
    pub guid: Uuid,
    /// What was sold
    pub description: String,
    /// Income account the line books against
    pub account_guid: AccountId,
    /// Unit price
    pub price: Decimal,
    /// Unit count as a rational (3 units = 3/1)
    pub quantity: Quantity,
}

impl InvoiceEntry {
    pub fn new(
        description: impl Into<String>,
        account_guid: AccountId,
        price: Decimal,
        quantity: Quantity,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            description: description.into(),
            account_guid,
            price,
            quantity,
        }
    }

    /// Line amount: price x quantity, rounded to ledger precision
    pub fn amount(&self) -> Decimal {
        round_amount(self.price * self.quantity.to_decimal())
    }
}

/// A sales invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub guid: InvoiceId,
    /// Business-facing invoice number (unique)
    pub number: String,
    /// Billed customer
    pub customer_guid: CustomerId,
    /// Line items
    pub entries: Vec<InvoiceEntry>,
    /// Accounting effective date once posted
    pub date_posted: Option<DateTime<Utc>>,
    /// Payment due date
    pub date_due: Option<DateTime<Utc>>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Lifecycle state
    pub status: DocumentStatus,
    /// Set exactly once by the posting workflow
    pub post_txn: Option<TransactionId>,
    /// When the invoice was created
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a draft invoice with no entries
    pub fn draft(number: impl Into<String>, customer_guid: CustomerId) -> Self {
        Self {
            guid: InvoiceId::new(),
            number: number.into(),
            customer_guid,
            entries: Vec::new(),
            date_posted: None,
            date_due: None,
            notes: None,
            status: DocumentStatus::Draft,
            post_txn: None,
            created_at: Utc::now(),
        }
    }

    /// Adds a line item
    pub fn with_entry(mut self, entry: InvoiceEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Total amount across all line items
    pub fn total(&self) -> Decimal {
        round_amount(self.entries.iter().map(|e| e.amount()).sum())
    }

    /// Returns true if this invoice has already been posted
    pub fn is_posted(&self) -> bool {
        self.post_txn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entry_amount_uses_rational_quantity() {
        let entry = InvoiceEntry::new(
            "consulting hours",
            AccountId::new(),
            dec!(150.00),
            Quantity::new(3, 2),
        );
        assert_eq!(entry.amount(), dec!(225.00));
    }

    #[test]
    fn test_entry_with_zero_denominator_amounts_to_zero() {
        let entry = InvoiceEntry::new(
            "malformed quantity",
            AccountId::new(),
            dec!(150.00),
            Quantity::new(1, 0),
        );
        assert_eq!(entry.amount(), dec!(0));
    }

    #[test]
    fn test_invoice_total_sums_entries() {
        let account = AccountId::new();
        let invoice = Invoice::draft("INV-2024-001", CustomerId::new())
            .with_entry(InvoiceEntry::new("a", account, dec!(100.00), Quantity::ONE))
            .with_entry(InvoiceEntry::new("b", account, dec!(25.50), Quantity::new(2, 1)));
        assert_eq!(invoice.total(), dec!(151.00));
    }

    #[test]
    fn test_draft_invoice_is_unposted() {
        let invoice = Invoice::draft("INV-2024-002", CustomerId::new());
        assert!(!invoice.is_posted());
        assert_eq!(invoice.status, DocumentStatus::Draft);
    }
}
