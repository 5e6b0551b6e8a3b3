//! Chart of accounts
//!
//! Accounts form a tree via an optional parent reference. The tree is stored
//! flat (arena keyed by guid, parent relation as a foreign key); cycle
//! rejection happens by walking the parent chain before a reparent commits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use core_kernel::AccountId;

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// General asset (debit normal balance)
    Asset,
    /// Bank deposit account (debit normal)
    Bank,
    /// Cash on hand (debit normal)
    Cash,
    /// Accounts receivable (debit normal)
    Receivable,
    /// General liability (credit normal)
    Liability,
    /// Accounts payable (credit normal)
    Payable,
    /// Credit card liability (credit normal)
    CreditCard,
    /// Equity (credit normal)
    Equity,
    /// Income (credit normal)
    Income,
    /// Revenue (credit normal)
    Revenue,
    /// Expense (debit normal)
    Expense,
    /// The singleton root of the account tree; never holds splits
    Root,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(
            self,
            AccountType::Asset
                | AccountType::Bank
                | AccountType::Cash
                | AccountType::Receivable
                | AccountType::Expense
                | AccountType::Root
        )
    }

    /// Account types zeroed out by an income/expense period closing
    pub fn closing_types() -> &'static [AccountType] {
        &[AccountType::Income, AccountType::Revenue, AccountType::Expense]
    }

    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "ASSET",
            AccountType::Bank => "BANK",
            AccountType::Cash => "CASH",
            AccountType::Receivable => "RECEIVABLE",
            AccountType::Liability => "LIABILITY",
            AccountType::Payable => "PAYABLE",
            AccountType::CreditCard => "CREDIT_CARD",
            AccountType::Equity => "EQUITY",
            AccountType::Income => "INCOME",
            AccountType::Revenue => "REVENUE",
            AccountType::Expense => "EXPENSE",
            AccountType::Root => "ROOT",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown account type string
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown account type: {0}")]
pub struct ParseAccountTypeError(pub String);

impl FromStr for AccountType {
    type Err = ParseAccountTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASSET" => Ok(AccountType::Asset),
            "BANK" => Ok(AccountType::Bank),
            "CASH" => Ok(AccountType::Cash),
            "RECEIVABLE" => Ok(AccountType::Receivable),
            "LIABILITY" => Ok(AccountType::Liability),
            "PAYABLE" => Ok(AccountType::Payable),
            "CREDIT_CARD" => Ok(AccountType::CreditCard),
            "EQUITY" => Ok(AccountType::Equity),
            "INCOME" => Ok(AccountType::Income),
            "REVENUE" => Ok(AccountType::Revenue),
            "EXPENSE" => Ok(AccountType::Expense),
            "ROOT" => Ok(AccountType::Root),
            other => Err(ParseAccountTypeError(other.to_string())),
        }
    }
}

/// An account in the chart of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub guid: AccountId,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Parent account (None for top-level accounts)
    pub parent_guid: Option<AccountId>,
    /// Account code (e.g., "1100")
    pub code: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Hidden from account pickers
    pub hidden: bool,
    /// Placeholder accounts structure the tree and cannot hold splits
    pub placeholder: bool,
}

impl Account {
    /// Creates a new account
    pub fn new(guid: AccountId, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            guid,
            name: name.into(),
            account_type,
            parent_guid: None,
            code: None,
            description: None,
            hidden: false,
            placeholder: false,
        }
    }

    /// Creates the singleton root account
    pub fn root() -> Self {
        Self::new(AccountId::new(), "Root Account", AccountType::Root).as_placeholder()
    }

    /// Sets the parent account
    pub fn with_parent(mut self, parent_guid: AccountId) -> Self {
        self.parent_guid = Some(parent_guid);
        self
    }

    /// Sets the account code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the account as a structural placeholder
    pub fn as_placeholder(mut self) -> Self {
        self.placeholder = true;
        self
    }
}

/// Checks whether reparenting `account` under `new_parent` would create a cycle
///
/// `parents` maps every account to its current parent. Walks the parent chain
/// upward from `new_parent`; if the chain reaches `account` (or the chain is
/// longer than the account count, which means the stored tree is already
/// corrupt) the reparent must be rejected. Self-parenting is a cycle.
pub fn would_create_cycle(
    parents: &HashMap<AccountId, Option<AccountId>>,
    account: AccountId,
    new_parent: AccountId,
) -> bool {
    if account == new_parent {
        return true;
    }

    let mut cursor = Some(new_parent);
    let mut hops = 0usize;
    while let Some(current) = cursor {
        if current == account {
            return true;
        }
        hops += 1;
        if hops > parents.len() {
            return true;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(edges: &[(AccountId, Option<AccountId>)]) -> HashMap<AccountId, Option<AccountId>> {
        edges.iter().copied().collect()
    }

    #[test]
    fn test_debit_normal_types() {
        assert!(AccountType::Asset.is_debit_normal());
        assert!(AccountType::Bank.is_debit_normal());
        assert!(AccountType::Expense.is_debit_normal());
        assert!(!AccountType::Liability.is_debit_normal());
        assert!(!AccountType::Revenue.is_debit_normal());
        assert!(!AccountType::Equity.is_debit_normal());
    }

    #[test]
    fn test_account_type_round_trip() {
        for ty in [
            AccountType::Asset,
            AccountType::CreditCard,
            AccountType::Revenue,
            AccountType::Root,
        ] {
            assert_eq!(ty.as_str().parse::<AccountType>().unwrap(), ty);
        }
        assert!("PIGGY_BANK".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_reparent_to_own_descendant_is_cycle() {
        let (a, b, c) = (AccountId::new(), AccountId::new(), AccountId::new());
        // a -> b -> c
        let parents = tree(&[(a, None), (b, Some(a)), (c, Some(b))]);
        assert!(would_create_cycle(&parents, a, c));
        assert!(would_create_cycle(&parents, a, a));
    }

    #[test]
    fn test_reparent_to_sibling_is_not_cycle() {
        let (root, a, b) = (AccountId::new(), AccountId::new(), AccountId::new());
        let parents = tree(&[(root, None), (a, Some(root)), (b, Some(root))]);
        assert!(!would_create_cycle(&parents, a, b));
    }
}
