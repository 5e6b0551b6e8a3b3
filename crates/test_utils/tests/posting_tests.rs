//! Service-level tests for the document posting workflow.

use rust_decimal_macros::dec;

use domain_documents::posting::DocumentRef;
use domain_documents::{DocumentPostingService, DocumentStatus, PostingError};
use domain_ledger::{AccountSource, BalanceQuery, TransactionKind};
use test_utils::{assert_balanced, confirmed_bill, confirmed_invoice, ledger_with_chart, split_value};
use uuid::Uuid;

#[tokio::test]
async fn invoice_posts_into_exactly_one_balanced_transaction() {
    let (store, chart) = ledger_with_chart();
    let invoice = confirmed_invoice("INV-2024-001", dec!(500.00));
    let doc = invoice.doc;
    store.add_document(invoice);

    let service =
        DocumentPostingService::new(store.clone(), store.clone(), chart.posting_accounts());
    let receipt = service.post_document(doc).await.unwrap();

    let transactions = store.transactions();
    assert_eq!(transactions.len(), 1);
    let txn = &transactions[0];
    assert_eq!(txn.guid, receipt.transaction);
    assert_eq!(txn.kind, TransactionKind::Ordinary);
    assert_eq!(split_value(txn, chart.receivable), dec!(500.00));
    assert_eq!(split_value(txn, chart.revenue), dec!(-500.00));

    let posted = store.document(doc).unwrap();
    assert_eq!(posted.post_txn, Some(receipt.transaction));
    assert_eq!(posted.status, DocumentStatus::Posted);

    // Natural balances: receivable up by the total, revenue recognized.
    let receivable = store.balance(chart.receivable, BalanceQuery::all_time()).await.unwrap();
    let revenue = store.balance(chart.revenue, BalanceQuery::all_time()).await.unwrap();
    assert_eq!(receivable, dec!(500.00));
    assert_eq!(revenue, dec!(500.00));
}

#[tokio::test]
async fn bill_posts_expense_against_payable() {
    let (store, chart) = ledger_with_chart();
    let bill = confirmed_bill("BILL-2024-010", dec!(820.40));
    let doc = bill.doc;
    store.add_document(bill);

    let service =
        DocumentPostingService::new(store.clone(), store.clone(), chart.posting_accounts());
    service.post_document(doc).await.unwrap();

    let transactions = store.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(split_value(&transactions[0], chart.expense), dec!(820.40));
    assert_eq!(split_value(&transactions[0], chart.payable), dec!(-820.40));

    let payable = store.balance(chart.payable, BalanceQuery::all_time()).await.unwrap();
    assert_eq!(payable, dec!(820.40));
}

#[tokio::test]
async fn second_posting_attempt_is_rejected() {
    let (store, chart) = ledger_with_chart();
    let invoice = confirmed_invoice("INV-2024-002", dec!(150.00));
    let doc = invoice.doc;
    store.add_document(invoice);

    let service =
        DocumentPostingService::new(store.clone(), store.clone(), chart.posting_accounts());
    service.post_document(doc).await.unwrap();

    let err = service.post_document(doc).await.unwrap_err();
    assert!(matches!(err, PostingError::AlreadyPosted(_)), "got {err}");
    assert_eq!(store.transactions().len(), 1);
}

#[tokio::test]
async fn missing_document_is_not_found() {
    let (store, chart) = ledger_with_chart();
    let service =
        DocumentPostingService::new(store.clone(), store.clone(), chart.posting_accounts());

    let err = service
        .post_document(DocumentRef::invoice(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, PostingError::NotFound(_)), "got {err}");
}

#[tokio::test]
async fn cancelled_document_cannot_post() {
    let (store, chart) = ledger_with_chart();
    let mut invoice = confirmed_invoice("INV-2024-003", dec!(75.00));
    invoice.status = DocumentStatus::Cancelled;
    let doc = invoice.doc;
    store.add_document(invoice);

    let service =
        DocumentPostingService::new(store.clone(), store.clone(), chart.posting_accounts());
    let err = service.post_document(doc).await.unwrap_err();
    assert!(matches!(err, PostingError::Business(_)), "got {err}");
    assert!(store.transactions().is_empty());
}

#[tokio::test]
async fn zero_total_is_rejected_before_any_write() {
    let (store, chart) = ledger_with_chart();
    let invoice = confirmed_invoice("INV-2024-004", dec!(0));
    let doc = invoice.doc;
    store.add_document(invoice);

    let service =
        DocumentPostingService::new(store.clone(), store.clone(), chart.posting_accounts());
    let err = service.post_document(doc).await.unwrap_err();
    assert!(matches!(err, PostingError::Business(_)), "got {err}");
    assert!(store.transactions().is_empty());
    assert!(store.document(doc).unwrap().post_txn.is_none());
}

#[tokio::test]
async fn storage_failure_leaves_no_partial_state_and_is_retryable() {
    let (store, chart) = ledger_with_chart();
    let invoice = confirmed_invoice("INV-2024-005", dec!(250.00));
    let doc = invoice.doc;
    store.add_document(invoice);

    let service =
        DocumentPostingService::new(store.clone(), store.clone(), chart.posting_accounts());

    store.fail_next_write();
    let err = service.post_document(doc).await.unwrap_err();
    assert!(matches!(err, PostingError::Storage(_)), "got {err}");

    // Nothing partial: no transaction, document still unposted.
    assert!(store.transactions().is_empty());
    assert!(store.document(doc).unwrap().post_txn.is_none());

    // The same call succeeds on retry.
    let receipt = service.post_document(doc).await.unwrap();
    assert_eq!(store.document(doc).unwrap().post_txn, Some(receipt.transaction));
}

#[tokio::test]
async fn posting_transaction_is_balanced_for_arbitrary_totals() {
    let (store, chart) = ledger_with_chart();
    for (i, total) in [dec!(0.01), dec!(99.99), dec!(1234.56)].into_iter().enumerate() {
        let invoice = confirmed_invoice(&format!("INV-2024-1{i:02}"), total);
        let document = invoice.clone();
        store.add_document(invoice);
        let txn =
            domain_documents::posting::build_posting_transaction(&document, &chart.posting_accounts())
                .unwrap();
        assert_balanced(&txn);
    }
}
