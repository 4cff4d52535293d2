//! Single-use cheques under the system-wide debit-on-issuance policy.
//!
//! The face amount leaves the payer's account when the cheque is created and
//! sits in the payer bank's cheque float until cashing releases it to the
//! payee. This keeps the "leaves the circulating total exactly once"
//! guarantee local to issuance, and keeps conservation checkable while the
//! cheque is in flight.

use contracts::ChequeStanding;

use crate::ledger::{LedgerError, MoneyLedger};
use crate::period::Period;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChequeError {
    UnknownCheque(String),
    /// Second cashing attempt on a consumed cheque. Fatal: the runner
    /// converts this into a consistency violation and halts the run.
    AlreadyCashed(String),
    /// A deposit-side failure (insufficient funds, unknown payee, ...).
    Funds(LedgerError),
}

impl From<LedgerError> for ChequeError {
    fn from(err: LedgerError) -> Self {
        ChequeError::Funds(err)
    }
}

impl std::fmt::Display for ChequeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChequeError::UnknownCheque(id) => write!(f, "unknown cheque: {}", id),
            ChequeError::AlreadyCashed(id) => write!(f, "cheque already cashed: {}", id),
            ChequeError::Funds(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ChequeError {}

// ---------------------------------------------------------------------------
// The cheque record
// ---------------------------------------------------------------------------

/// An immutable transfer instrument with a fixed face amount, consumed
/// exactly once on cashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cheque {
    pub cheque_id: String,
    pub payer_account: String,
    pub payer_bank: String,
    pub payee_account: String,
    pub amount: i64,
    pub issued_period: Period,
    pub cashed_period: Option<Period>,
}

impl Cheque {
    pub fn standing(&self) -> ChequeStanding {
        if self.cashed_period.is_some() {
            ChequeStanding::Cashed
        } else {
            ChequeStanding::Outstanding
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger operations
// ---------------------------------------------------------------------------

impl MoneyLedger {
    /// Draw a cheque on `payer_account`: the face amount is debited here, at
    /// issuance, and parked in the payer bank's cheque float. The payee
    /// account is validated now so cashing cannot fail on an unknown payee.
    pub fn issue_cheque(
        &mut self,
        payer_account: &str,
        payee_account: &str,
        amount: i64,
        now: Period,
        phase: &str,
    ) -> Result<String, ChequeError> {
        let payee = self
            .accounts
            .get(payee_account)
            .ok_or_else(|| LedgerError::UnknownAccount(payee_account.to_string()))?;
        if !payee.open {
            return Err(ChequeError::Funds(LedgerError::AccountClosed(
                payee_account.to_string(),
            )));
        }
        let payer_bank = self
            .accounts
            .get(payer_account)
            .ok_or_else(|| LedgerError::UnknownAccount(payer_account.to_string()))?
            .bank_id
            .clone();

        self.debit(payer_account, amount)?;
        self.banks
            .get_mut(&payer_bank)
            .expect("bank of an open account")
            .cheque_float += amount;

        self.next_cheque_seq += 1;
        let cheque_id = format!("cheque:{}", self.next_cheque_seq);
        self.cheques.insert(
            cheque_id.clone(),
            Cheque {
                cheque_id: cheque_id.clone(),
                payer_account: payer_account.to_string(),
                payer_bank: payer_bank.clone(),
                payee_account: payee_account.to_string(),
                amount,
                issued_period: now,
                cashed_period: None,
            },
        );
        self.record(now, phase, payer_account, &cheque_id, amount, "cheque_issued");
        Ok(cheque_id)
    }

    /// Credit the payee and consume the cheque. Cashing only credits —
    /// the debit already happened at issuance.
    pub fn cash_cheque(
        &mut self,
        cheque_id: &str,
        now: Period,
        phase: &str,
    ) -> Result<i64, ChequeError> {
        let cheque = self
            .cheques
            .get(cheque_id)
            .ok_or_else(|| ChequeError::UnknownCheque(cheque_id.to_string()))?;
        if cheque.cashed_period.is_some() {
            return Err(ChequeError::AlreadyCashed(cheque_id.to_string()));
        }
        let amount = cheque.amount;
        let payee = cheque.payee_account.clone();
        let payer_bank = cheque.payer_bank.clone();

        self.credit(&payee, amount)?;
        self.banks
            .get_mut(&payer_bank)
            .expect("payer bank recorded at issuance")
            .cheque_float -= amount;
        self.cheques
            .get_mut(cheque_id)
            .expect("cheque fetched above")
            .cashed_period = Some(now);
        self.record(now, phase, cheque_id, &payee, amount, "cheque_cashed");
        Ok(amount)
    }

    /// Cheques drawn but not yet cashed, in registry order.
    pub fn outstanding_cheques_for(&self, payee_account: &str) -> Vec<String> {
        self.cheques
            .values()
            .filter(|cheque| {
                cheque.cashed_period.is_none() && cheque.payee_account == payee_account
            })
            .map(|cheque| cheque.cheque_id.clone())
            .collect()
    }
}
