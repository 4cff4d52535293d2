//! Deposit ledger: accounts, per-bank books, and the transfer journal.
//!
//! Every mutation that moves deposit money updates the owning bank's recorded
//! aggregates in the same call, so the deposit invariant (bank liability ==
//! sum of its accounts' balances) never transiently breaks across an
//! observable boundary. Loans and cheques extend this ledger in their own
//! modules.

use std::collections::BTreeMap;

use contracts::TransferRecord;

use crate::cheque::Cheque;
use crate::loan::Loan;
use crate::period::Period;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Recoverable ledger failures. Every variant is returned to the calling
/// sector, which decides policy (partial fulfillment, default flagging, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    UnknownAccount(String),
    UnknownBank(String),
    AccountExists(String),
    BankExists(String),
    AccountClosed(String),
    /// Debit beyond the available balance with no authorized cover.
    InsufficientFunds {
        account_id: String,
        requested: i64,
        available: i64,
    },
    /// Negative amount passed to a credit/debit-shaped operation.
    InvalidAmount(i64),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::UnknownAccount(id) => write!(f, "unknown account: {}", id),
            LedgerError::UnknownBank(id) => write!(f, "unknown bank: {}", id),
            LedgerError::AccountExists(id) => write!(f, "account already exists: {}", id),
            LedgerError::BankExists(id) => write!(f, "bank already exists: {}", id),
            LedgerError::AccountClosed(id) => write!(f, "account is closed: {}", id),
            LedgerError::InsufficientFunds {
                account_id,
                requested,
                available,
            } => write!(
                f,
                "insufficient funds on {}: requested {} available {}",
                account_id, requested, available
            ),
            LedgerError::InvalidAmount(amount) => write!(f, "invalid amount: {}", amount),
        }
    }
}

impl std::error::Error for LedgerError {}

// ---------------------------------------------------------------------------
// Account and bank book
// ---------------------------------------------------------------------------

/// A deposit account: owned by exactly one holder, held at exactly one bank,
/// balance in integer minor-currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: String,
    pub holder_id: String,
    pub bank_id: String,
    pub balance: i64,
    pub open: bool,
}

/// A bank's recorded aggregates. `deposit_liability`, `cheque_float`, and
/// `loan_book` must always equal their recomputed counterparts; the sweep
/// treats any drift as fatal. `retained_earnings` is the equity slot that
/// absorbs interest income, write-off losses, and cancelled-account windfalls
/// so the global assets-equal-liabilities identity survives every sanctioned
/// operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankBook {
    pub bank_id: String,
    pub deposit_liability: i64,
    pub cheque_float: i64,
    pub loan_book: i64,
    pub retained_earnings: i64,
}

impl BankBook {
    fn new(bank_id: String) -> Self {
        Self {
            bank_id,
            deposit_liability: 0,
            cheque_float: 0,
            loan_book: 0,
            retained_earnings: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// MoneyLedger
// ---------------------------------------------------------------------------

/// The registries of accounts, banks, loans, and cheques, plus the append-only
/// transfer journal. Fields are public for inspection; the end-of-period
/// sweep is the guard against out-of-band mutation.
#[derive(Debug, Clone, Default)]
pub struct MoneyLedger {
    pub accounts: BTreeMap<String, Account>,
    pub banks: BTreeMap<String, BankBook>,
    pub loans: BTreeMap<String, Loan>,
    pub cheques: BTreeMap<String, Cheque>,
    pub journal: Vec<TransferRecord>,
    pub(crate) next_loan_seq: u64,
    pub(crate) next_cheque_seq: u64,
}

impl MoneyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_bank(&mut self, bank_id: impl Into<String>) -> Result<(), LedgerError> {
        let bank_id = bank_id.into();
        if self.banks.contains_key(&bank_id) {
            return Err(LedgerError::BankExists(bank_id));
        }
        self.banks.insert(bank_id.clone(), BankBook::new(bank_id));
        Ok(())
    }

    pub fn open_account(
        &mut self,
        account_id: impl Into<String>,
        holder_id: impl Into<String>,
        bank_id: &str,
    ) -> Result<(), LedgerError> {
        let account_id = account_id.into();
        if !self.banks.contains_key(bank_id) {
            return Err(LedgerError::UnknownBank(bank_id.to_string()));
        }
        if self.accounts.contains_key(&account_id) {
            return Err(LedgerError::AccountExists(account_id));
        }
        self.accounts.insert(
            account_id.clone(),
            Account {
                account_id,
                holder_id: holder_id.into(),
                bank_id: bank_id.to_string(),
                balance: 0,
                open: true,
            },
        );
        Ok(())
    }

    pub fn balance(&self, account_id: &str) -> Result<i64, LedgerError> {
        self.accounts
            .get(account_id)
            .map(|account| account.balance)
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.to_string()))
    }

    /// Sum of all open account balances across every bank.
    pub fn total_deposits(&self) -> i64 {
        self.accounts
            .values()
            .filter(|account| account.open)
            .map(|account| account.balance)
            .sum()
    }

    /// Increase an account's balance and its bank's deposit liability in one
    /// step. Negative amounts are a numeric domain error.
    pub fn credit(&mut self, account_id: &str, amount: i64) -> Result<(), LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let account = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.to_string()))?;
        if !account.open {
            return Err(LedgerError::AccountClosed(account_id.to_string()));
        }
        account.balance += amount;
        let bank_id = account.bank_id.clone();
        let bank = self
            .banks
            .get_mut(&bank_id)
            .ok_or(LedgerError::UnknownBank(bank_id))?;
        bank.deposit_liability += amount;
        Ok(())
    }

    /// Decrease an account's balance and its bank's deposit liability in one
    /// step. Fails recoverably when the balance does not cover the amount.
    pub fn debit(&mut self, account_id: &str, amount: i64) -> Result<(), LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let account = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.to_string()))?;
        if !account.open {
            return Err(LedgerError::AccountClosed(account_id.to_string()));
        }
        if account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: account_id.to_string(),
                requested: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        let bank_id = account.bank_id.clone();
        let bank = self
            .banks
            .get_mut(&bank_id)
            .ok_or(LedgerError::UnknownBank(bank_id))?;
        bank.deposit_liability -= amount;
        Ok(())
    }

    /// Journaled debit/credit pair between two accounts.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: i64,
        period: Period,
        phase: &str,
        cause: &str,
    ) -> Result<String, LedgerError> {
        // Validate the credit leg before debiting so a failure leaves no
        // half-applied movement.
        let payee = self
            .accounts
            .get(to)
            .ok_or_else(|| LedgerError::UnknownAccount(to.to_string()))?;
        if !payee.open {
            return Err(LedgerError::AccountClosed(to.to_string()));
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(self.record(period, phase, from, to, amount, cause))
    }

    /// Bankruptcy/closure flow: zero the balance, write the bank's liability
    /// off into retained earnings, and close the account. Irreversible.
    pub fn cancel_account(
        &mut self,
        account_id: &str,
        period: Period,
        phase: &str,
    ) -> Result<i64, LedgerError> {
        let account = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.to_string()))?;
        if !account.open {
            return Err(LedgerError::AccountClosed(account_id.to_string()));
        }
        let written_off = account.balance;
        account.balance = 0;
        account.open = false;
        let bank_id = account.bank_id.clone();
        let bank = self
            .banks
            .get_mut(&bank_id)
            .ok_or_else(|| LedgerError::UnknownBank(bank_id.clone()))?;
        bank.deposit_liability -= written_off;
        bank.retained_earnings += written_off;
        self.record(
            period,
            phase,
            account_id,
            &bank_id,
            written_off,
            "account_cancelled",
        );
        Ok(written_off)
    }

    pub(crate) fn record(
        &mut self,
        period: Period,
        phase: &str,
        from: &str,
        to: &str,
        amount: i64,
        cause: &str,
    ) -> String {
        let transfer_id = format!("xfer:{}:{}", period, self.journal.len() + 1);
        self.journal.push(TransferRecord {
            transfer_id: transfer_id.clone(),
            period: period.index(),
            phase: phase.to_string(),
            from_account: from.to_string(),
            to_account: to.to_string(),
            amount,
            cause: Some(cause.to_string()),
        });
        transfer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_account_ledger() -> MoneyLedger {
        let mut ledger = MoneyLedger::new();
        ledger.open_bank("bank:b1").expect("bank");
        ledger
            .open_account("acct:a1", "agent:h1", "bank:b1")
            .expect("a1");
        ledger
            .open_account("acct:a2", "agent:h2", "bank:b1")
            .expect("a2");
        ledger
    }

    #[test]
    fn credit_updates_balance_and_bank_liability_together() {
        let mut ledger = two_account_ledger();
        ledger.credit("acct:a1", 250).expect("credit");
        assert_eq!(ledger.balance("acct:a1").unwrap(), 250);
        assert_eq!(ledger.banks["bank:b1"].deposit_liability, 250);
    }

    #[test]
    fn debit_beyond_balance_is_recoverable() {
        let mut ledger = two_account_ledger();
        ledger.credit("acct:a1", 100).expect("credit");
        let err = ledger.debit("acct:a1", 150).expect_err("must fail");
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account_id: "acct:a1".to_string(),
                requested: 150,
                available: 100,
            }
        );
        // The failed debit left nothing half-applied.
        assert_eq!(ledger.balance("acct:a1").unwrap(), 100);
        assert_eq!(ledger.banks["bank:b1"].deposit_liability, 100);
    }

    #[test]
    fn negative_amounts_fail_synchronously() {
        let mut ledger = two_account_ledger();
        assert_eq!(
            ledger.credit("acct:a1", -1),
            Err(LedgerError::InvalidAmount(-1))
        );
        assert_eq!(
            ledger.debit("acct:a1", -7),
            Err(LedgerError::InvalidAmount(-7))
        );
    }

    #[test]
    fn transfer_conserves_total_deposits_and_journals_once() {
        let mut ledger = two_account_ledger();
        ledger.credit("acct:a1", 500).expect("credit");
        let before = ledger.total_deposits();
        let transfer_id = ledger
            .transfer("acct:a1", "acct:a2", 180, Period::new(2), "goods", "purchase")
            .expect("transfer");
        assert_eq!(ledger.total_deposits(), before);
        assert_eq!(ledger.balance("acct:a2").unwrap(), 180);
        assert_eq!(ledger.journal.len(), 1);
        assert_eq!(ledger.journal[0].transfer_id, transfer_id);
        assert_eq!(ledger.journal[0].phase, "goods");
    }

    #[test]
    fn transfer_to_unknown_payee_leaves_payer_untouched() {
        let mut ledger = two_account_ledger();
        ledger.credit("acct:a1", 500).expect("credit");
        let err = ledger
            .transfer("acct:a1", "acct:missing", 100, Period::ZERO, "goods", "x")
            .expect_err("must fail");
        assert!(matches!(err, LedgerError::UnknownAccount(_)));
        assert_eq!(ledger.balance("acct:a1").unwrap(), 500);
        assert!(ledger.journal.is_empty());
    }

    #[test]
    fn cancel_account_writes_liability_off_into_equity() {
        let mut ledger = two_account_ledger();
        ledger.credit("acct:a1", 320).expect("credit");
        let written_off = ledger
            .cancel_account("acct:a1", Period::new(5), "settlement")
            .expect("cancel");
        assert_eq!(written_off, 320);
        assert_eq!(ledger.balance("acct:a1").unwrap(), 0);
        assert_eq!(ledger.banks["bank:b1"].deposit_liability, 0);
        assert_eq!(ledger.banks["bank:b1"].retained_earnings, 320);
        // Irreversible: further movement is rejected.
        assert_eq!(
            ledger.credit("acct:a1", 1),
            Err(LedgerError::AccountClosed("acct:a1".to_string()))
        );
        assert_eq!(
            ledger.cancel_account("acct:a1", Period::new(5), "settlement"),
            Err(LedgerError::AccountClosed("acct:a1".to_string()))
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut ledger = two_account_ledger();
        assert_eq!(
            ledger.open_bank("bank:b1"),
            Err(LedgerError::BankExists("bank:b1".to_string()))
        );
        assert_eq!(
            ledger.open_account("acct:a1", "agent:x", "bank:b1"),
            Err(LedgerError::AccountExists("acct:a1".to_string()))
        );
        assert_eq!(
            ledger.open_account("acct:a9", "agent:x", "bank:none"),
            Err(LedgerError::UnknownBank("bank:none".to_string()))
        );
    }
}
