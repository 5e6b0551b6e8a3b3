//! Invoice and purchase bill persistence
//!
//! `commit_posting` is the exactly-once seam: the transaction insert and the
//! conditional `post_txn IS NULL` document update share one database
//! transaction, so a concurrent duplicate posting attempt rolls everything
//! back and writes nothing.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use core_kernel::{AccountId, BillId, CustomerId, InvoiceId, TransactionId, VendorId};
use domain_documents::posting::{DocumentRef, DocumentType, PostableDocument};
use domain_documents::{DocumentStatus, Invoice, InvoiceEntry, PurchaseBill};
use domain_ledger::{NewTransaction, Quantity};

use crate::error::DatabaseError;
use crate::repositories::insert_transaction_with_splits;

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    guid: Uuid,
    number: String,
    customer_guid: Uuid,
    customer_name: Option<String>,
    date_posted: Option<DateTime<Utc>>,
    date_due: Option<DateTime<Utc>>,
    notes: Option<String>,
    status: String,
    post_txn: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct InvoiceEntryRow {
    guid: Uuid,
    description: String,
    account_guid: Uuid,
    price: Decimal,
    quantity_num: i64,
    quantity_denom: i64,
}

#[derive(sqlx::FromRow)]
struct BillRow {
    guid: Uuid,
    bill_number: String,
    vendor_guid: Uuid,
    vendor_name: Option<String>,
    bill_date: NaiveDate,
    due_date: Option<NaiveDate>,
    total_amount: Decimal,
    notes: Option<String>,
    status: String,
    post_txn: Option<Uuid>,
    created_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<DocumentStatus, DatabaseError> {
    raw.parse()
        .map_err(|e: domain_documents::ParseDocumentStatusError| DatabaseError::Sql(e.to_string()))
}

impl InvoiceEntryRow {
    fn into_entry(self) -> InvoiceEntry {
        InvoiceEntry {
            guid: self.guid,
            description: self.description,
            account_guid: AccountId::from_uuid(self.account_guid),
            price: self.price,
            quantity: Quantity::new(self.quantity_num, self.quantity_denom),
        }
    }
}

impl InvoiceRow {
    fn into_invoice(self, entries: Vec<InvoiceEntry>) -> Result<Invoice, DatabaseError> {
        let status = parse_status(&self.status)?;
        Ok(Invoice {
            guid: InvoiceId::from_uuid(self.guid),
            number: self.number,
            customer_guid: CustomerId::from_uuid(self.customer_guid),
            entries,
            date_posted: self.date_posted,
            date_due: self.date_due,
            notes: self.notes,
            status,
            post_txn: self.post_txn.map(TransactionId::from_uuid),
            created_at: self.created_at,
        })
    }
}

impl BillRow {
    fn into_bill(self) -> Result<PurchaseBill, DatabaseError> {
        let status = parse_status(&self.status)?;
        Ok(PurchaseBill {
            guid: BillId::from_uuid(self.guid),
            bill_number: self.bill_number,
            vendor_guid: VendorId::from_uuid(self.vendor_guid),
            bill_date: self.bill_date,
            due_date: self.due_date,
            total_amount: self.total_amount,
            notes: self.notes,
            status,
            post_txn: self.post_txn.map(TransactionId::from_uuid),
            created_at: self.created_at,
        })
    }
}

/// SQL access to postable business documents.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an invoice with all of its line items atomically.
    pub async fn create_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO invoices
                (guid, number, customer_guid, date_posted, date_due, notes, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(invoice.guid.as_uuid())
        .bind(&invoice.number)
        .bind(invoice.customer_guid.as_uuid())
        .bind(invoice.date_posted)
        .bind(invoice.date_due)
        .bind(&invoice.notes)
        .bind(invoice.status.as_str())
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await?;

        for entry in &invoice.entries {
            sqlx::query(
                r#"
                INSERT INTO invoice_entries
                    (guid, invoice_guid, description, account_guid, price,
                     quantity_num, quantity_denom)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.guid)
            .bind(invoice.guid.as_uuid())
            .bind(&entry.description)
            .bind(entry.account_guid.as_uuid())
            .bind(entry.price)
            .bind(entry.quantity.num)
            .bind(entry.quantity.denom)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Inserts a purchase bill.
    pub async fn create_bill(&self, bill: &PurchaseBill) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO purchase_bills
                (guid, bill_number, vendor_guid, bill_date, due_date, total_amount,
                 notes, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(bill.guid.as_uuid())
        .bind(&bill.bill_number)
        .bind(bill.vendor_guid.as_uuid())
        .bind(bill.bill_date)
        .bind(bill.due_date)
        .bind(bill.total_amount)
        .bind(&bill.notes)
        .bind(bill.status.as_str())
        .bind(bill.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches an invoice with its line items.
    pub async fn fetch_invoice(&self, guid: InvoiceId) -> Result<Option<Invoice>, DatabaseError> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT i.guid, i.number, i.customer_guid, c.name AS customer_name,
                   i.date_posted, i.date_due, i.notes, i.status, i.post_txn, i.created_at
            FROM invoices i
            LEFT JOIN customers c ON c.guid = i.customer_guid
            WHERE i.guid = $1
            "#,
        )
        .bind(guid.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let entries = self.invoice_entries(guid).await?;
        Ok(Some(row.into_invoice(entries)?))
    }

    /// Fetches a purchase bill.
    pub async fn fetch_bill(&self, guid: BillId) -> Result<Option<PurchaseBill>, DatabaseError> {
        let row: Option<BillRow> = sqlx::query_as(
            r#"
            SELECT b.guid, b.bill_number, b.vendor_guid, v.name AS vendor_name,
                   b.bill_date, b.due_date, b.total_amount, b.notes, b.status,
                   b.post_txn, b.created_at
            FROM purchase_bills b
            LEFT JOIN vendors v ON v.guid = b.vendor_guid
            WHERE b.guid = $1
            "#,
        )
        .bind(guid.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(BillRow::into_bill).transpose()
    }

    async fn invoice_entries(&self, guid: InvoiceId) -> Result<Vec<InvoiceEntry>, DatabaseError> {
        let rows: Vec<InvoiceEntryRow> = sqlx::query_as(
            "SELECT guid, description, account_guid, price, quantity_num, quantity_denom
             FROM invoice_entries WHERE invoice_guid = $1 ORDER BY guid",
        )
        .bind(guid.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(InvoiceEntryRow::into_entry).collect())
    }

    /// Builds the posting projection for a document, or `None` if absent.
    pub async fn fetch_postable(
        &self,
        doc: DocumentRef,
    ) -> Result<Option<PostableDocument>, DatabaseError> {
        match doc.document_type {
            DocumentType::Invoice => {
                let row: Option<InvoiceRow> = sqlx::query_as(
                    r#"
                    SELECT i.guid, i.number, i.customer_guid, c.name AS customer_name,
                           i.date_posted, i.date_due, i.notes, i.status, i.post_txn, i.created_at
                    FROM invoices i
                    LEFT JOIN customers c ON c.guid = i.customer_guid
                    WHERE i.guid = $1
                    "#,
                )
                .bind(doc.guid)
                .fetch_optional(&self.pool)
                .await?;

                let Some(row) = row else { return Ok(None) };
                let counterparty = row
                    .customer_name
                    .clone()
                    .unwrap_or_else(|| row.customer_guid.to_string());
                let post_date = row.date_posted.unwrap_or(row.created_at);
                let enter_date = row.created_at;
                let invoice = row.into_invoice(
                    self.invoice_entries(InvoiceId::from_uuid(doc.guid)).await?,
                )?;

                Ok(Some(PostableDocument {
                    doc,
                    number: invoice.number.clone(),
                    counterparty,
                    total: invoice.total(),
                    post_date,
                    enter_date,
                    status: invoice.status,
                    post_txn: invoice.post_txn,
                }))
            }
            DocumentType::PurchaseBill => {
                let row: Option<BillRow> = sqlx::query_as(
                    r#"
                    SELECT b.guid, b.bill_number, b.vendor_guid, v.name AS vendor_name,
                           b.bill_date, b.due_date, b.total_amount, b.notes, b.status,
                           b.post_txn, b.created_at
                    FROM purchase_bills b
                    LEFT JOIN vendors v ON v.guid = b.vendor_guid
                    WHERE b.guid = $1
                    "#,
                )
                .bind(doc.guid)
                .fetch_optional(&self.pool)
                .await?;

                let Some(row) = row else { return Ok(None) };
                let counterparty = row
                    .vendor_name
                    .clone()
                    .unwrap_or_else(|| row.vendor_guid.to_string());
                // Bills post on their issue date at start of day.
                let post_date = row
                    .bill_date
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc())
                    .unwrap_or(row.created_at);
                let enter_date = row.created_at;
                let bill = row.into_bill()?;

                Ok(Some(PostableDocument {
                    doc,
                    number: bill.bill_number.clone(),
                    counterparty,
                    total: bill.total_amount,
                    post_date,
                    enter_date,
                    status: bill.status,
                    post_txn: bill.post_txn,
                }))
            }
        }
    }

    /// Persists the posting transaction and flips the document to posted,
    /// atomically and exactly once.
    ///
    /// The document update is conditional on `post_txn IS NULL`; if another
    /// posting won the race the update touches zero rows and the whole
    /// database transaction rolls back.
    pub async fn commit_posting(
        &self,
        doc: DocumentRef,
        txn: &NewTransaction,
    ) -> Result<TransactionId, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        insert_transaction_with_splits(&mut tx, txn).await?;

        let updated = match doc.document_type {
            DocumentType::Invoice => sqlx::query(
                "UPDATE invoices
                 SET post_txn = $1, status = 'posted',
                     date_posted = COALESCE(date_posted, $3)
                 WHERE guid = $2 AND post_txn IS NULL",
            )
            .bind(txn.guid.as_uuid())
            .bind(doc.guid)
            .bind(txn.post_date)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
            DocumentType::PurchaseBill => sqlx::query(
                "UPDATE purchase_bills
                 SET post_txn = $1, status = 'posted'
                 WHERE guid = $2 AND post_txn IS NULL",
            )
            .bind(txn.guid.as_uuid())
            .bind(doc.guid)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
        };

        if updated != 1 {
            // Implicit rollback when `tx` drops uncommitted.
            return Err(DatabaseError::DuplicateEntry(format!(
                "document {doc} is already posted"
            )));
        }

        tx.commit().await?;
        debug!(document = %doc, txn = %txn.guid, "document posted");
        Ok(txn.guid)
    }
}
