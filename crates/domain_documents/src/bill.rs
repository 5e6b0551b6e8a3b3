//! Purchase bills

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BillId, TransactionId, VendorId};

use crate::status::DocumentStatus;

/// A vendor purchase bill
///
/// Unlike invoices, bills carry a precomputed total rather than line items;
/// the expense breakdown lives with the vendor document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseBill {
    /// Unique identifier
    pub guid: BillId,
    /// Business-facing bill number (unique)
    pub bill_number: String,
    /// Billing vendor
    pub vendor_guid: VendorId,
    /// Date the bill was issued
    pub bill_date: NaiveDate,
    /// Payment due date
    pub due_date: Option<NaiveDate>,
    /// Total amount owed
    pub total_amount: Decimal,
    /// Free-text notes
    pub notes: Option<String>,
    /// Lifecycle state
    pub status: DocumentStatus,
    /// Set exactly once by the posting workflow
    pub post_txn: Option<TransactionId>,
    /// When the bill was recorded
    pub created_at: DateTime<Utc>,
}

impl PurchaseBill {
    /// Creates a draft bill
    pub fn draft(
        bill_number: impl Into<String>,
        vendor_guid: VendorId,
        bill_date: NaiveDate,
        total_amount: Decimal,
    ) -> Self {
        Self {
            guid: BillId::new(),
            bill_number: bill_number.into(),
            vendor_guid,
            bill_date,
            due_date: None,
            total_amount,
            notes: None,
            status: DocumentStatus::Draft,
            post_txn: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the due date
    pub fn due_on(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Returns true if this bill has already been posted
    pub fn is_posted(&self) -> bool {
        self.post_txn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_draft_bill() {
        let bill = PurchaseBill::draft(
            "BILL-2024-010",
            VendorId::new(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            dec!(820.40),
        )
        .due_on(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());

        assert!(!bill.is_posted());
        assert_eq!(bill.total_amount, dec!(820.40));
        assert!(bill.due_date.is_some());
    }
}
