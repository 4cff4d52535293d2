//! End-of-period consistency sweep.
//!
//! Recomputes every bank's deposit liability, cheque float, and loan book
//! from the underlying registries, rejects negative principals, and verifies
//! the global assets-equal-liabilities identity. Amounts are integers, so
//! the tolerance is zero.

use contracts::LedgerTotals;

use crate::ledger::MoneyLedger;
use crate::period::Period;

// ---------------------------------------------------------------------------
// Fault and violation types
// ---------------------------------------------------------------------------

/// The specific invariant that broke, with the offending entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyFault {
    DepositMismatch {
        bank_id: String,
        recorded: i64,
        computed: i64,
    },
    ChequeFloatMismatch {
        bank_id: String,
        recorded: i64,
        computed: i64,
    },
    LoanBookMismatch {
        bank_id: String,
        recorded: i64,
        computed: i64,
    },
    NegativePrincipal {
        loan_id: String,
        principal: i64,
    },
    ChequeAlreadyCashed {
        cheque_id: String,
    },
    LedgerImbalance {
        assets: i64,
        liabilities: i64,
    },
}

impl std::fmt::Display for ConsistencyFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyFault::DepositMismatch {
                bank_id,
                recorded,
                computed,
            } => write!(
                f,
                "bank {} deposit liability {} does not match account sum {}",
                bank_id, recorded, computed
            ),
            ConsistencyFault::ChequeFloatMismatch {
                bank_id,
                recorded,
                computed,
            } => write!(
                f,
                "bank {} cheque float {} does not match outstanding cheques {}",
                bank_id, recorded, computed
            ),
            ConsistencyFault::LoanBookMismatch {
                bank_id,
                recorded,
                computed,
            } => write!(
                f,
                "bank {} loan book {} does not match outstanding principal {}",
                bank_id, recorded, computed
            ),
            ConsistencyFault::NegativePrincipal { loan_id, principal } => {
                write!(f, "loan {} has negative principal {}", loan_id, principal)
            }
            ConsistencyFault::ChequeAlreadyCashed { cheque_id } => {
                write!(f, "cheque {} cashed twice", cheque_id)
            }
            ConsistencyFault::LedgerImbalance {
                assets,
                liabilities,
            } => write!(
                f,
                "total assets {} do not equal total liabilities {}",
                assets, liabilities
            ),
        }
    }
}

/// A fault located in time: the failing period and, when it surfaced inside
/// a phase rather than the sweep, the phase name. Fatal — the run halts,
/// is never retried, and nothing is rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyViolation {
    pub period: Period,
    pub phase: Option<String>,
    pub fault: ConsistencyFault,
}

impl std::fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.phase {
            Some(phase) => write!(f, "period {} phase {}: {}", self.period, phase, self.fault),
            None => write!(f, "period {} sweep: {}", self.period, self.fault),
        }
    }
}

impl std::error::Error for ConsistencyViolation {}

// ---------------------------------------------------------------------------
// The sweep
// ---------------------------------------------------------------------------

/// Recompute every recorded aggregate and the global identity. Returns the
/// system totals on success so the period's metric report can carry them.
pub fn verify_ledger(ledger: &MoneyLedger) -> Result<LedgerTotals, ConsistencyFault> {
    for (loan_id, loan) in &ledger.loans {
        if loan.principal < 0 {
            return Err(ConsistencyFault::NegativePrincipal {
                loan_id: loan_id.clone(),
                principal: loan.principal,
            });
        }
    }

    for (bank_id, book) in &ledger.banks {
        let deposit_sum: i64 = ledger
            .accounts
            .values()
            .filter(|account| account.open && &account.bank_id == bank_id)
            .map(|account| account.balance)
            .sum();
        if deposit_sum != book.deposit_liability {
            return Err(ConsistencyFault::DepositMismatch {
                bank_id: bank_id.clone(),
                recorded: book.deposit_liability,
                computed: deposit_sum,
            });
        }

        let float_sum: i64 = ledger
            .cheques
            .values()
            .filter(|cheque| cheque.cashed_period.is_none() && &cheque.payer_bank == bank_id)
            .map(|cheque| cheque.amount)
            .sum();
        if float_sum != book.cheque_float {
            return Err(ConsistencyFault::ChequeFloatMismatch {
                bank_id: bank_id.clone(),
                recorded: book.cheque_float,
                computed: float_sum,
            });
        }

        let principal_sum: i64 = ledger
            .loans
            .values()
            .filter(|loan| &loan.bank_id == bank_id)
            .map(|loan| loan.principal)
            .sum();
        if principal_sum != book.loan_book {
            return Err(ConsistencyFault::LoanBookMismatch {
                bank_id: bank_id.clone(),
                recorded: book.loan_book,
                computed: principal_sum,
            });
        }
    }

    let deposit_total: i64 = ledger.banks.values().map(|b| b.deposit_liability).sum();
    let cheque_float_total: i64 = ledger.banks.values().map(|b| b.cheque_float).sum();
    let loan_principal_total: i64 = ledger.banks.values().map(|b| b.loan_book).sum();
    let retained_earnings_total: i64 = ledger.banks.values().map(|b| b.retained_earnings).sum();

    let total_assets = loan_principal_total;
    let total_liabilities = deposit_total + cheque_float_total + retained_earnings_total;
    if total_assets != total_liabilities {
        return Err(ConsistencyFault::LedgerImbalance {
            assets: total_assets,
            liabilities: total_liabilities,
        });
    }

    Ok(LedgerTotals {
        total_assets,
        total_liabilities,
        deposit_total,
        cheque_float_total,
        loan_principal_total,
        retained_earnings_total,
    })
}
