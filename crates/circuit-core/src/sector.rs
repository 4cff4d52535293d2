//! The sector capability boundary.
//!
//! A sector is the population of agents sharing one economic role. The
//! runner invokes `run_phase` once per configured occurrence of a phase the
//! sector is named in; the sector applies ledger operations for its whole
//! population during that call. Recoverable ledger errors are the sector's
//! policy to absorb; whatever it propagates halts the run.

use std::collections::BTreeMap;

use crate::cheque::ChequeError;
use crate::consistency::ConsistencyFault;
use crate::ledger::{LedgerError, MoneyLedger};
use crate::loan::{LoanError, LoanTerms};
use crate::metrics::MetricWriter;
use crate::period::Period;
use crate::rng::SharedRng;

// ---------------------------------------------------------------------------
// Failure type
// ---------------------------------------------------------------------------

/// A failure a sector chose (or was forced) to propagate out of `run_phase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorFailure {
    Ledger(LedgerError),
    Loan(LoanError),
    Cheque(ChequeError),
    Fault(ConsistencyFault),
    /// Sector-level policy failure with no ledger counterpart.
    Policy(String),
}

impl SectorFailure {
    /// The consistency fault hiding inside this failure, if any. Double
    /// cashing surfaces as a `ChequeError` at the call site but is a
    /// conservation breach, so the runner reports it as one.
    pub fn consistency_fault(&self) -> Option<ConsistencyFault> {
        match self {
            SectorFailure::Cheque(ChequeError::AlreadyCashed(cheque_id)) => {
                Some(ConsistencyFault::ChequeAlreadyCashed {
                    cheque_id: cheque_id.clone(),
                })
            }
            SectorFailure::Fault(fault) => Some(fault.clone()),
            _ => None,
        }
    }
}

impl From<LedgerError> for SectorFailure {
    fn from(err: LedgerError) -> Self {
        SectorFailure::Ledger(err)
    }
}

impl From<LoanError> for SectorFailure {
    fn from(err: LoanError) -> Self {
        SectorFailure::Loan(err)
    }
}

impl From<ChequeError> for SectorFailure {
    fn from(err: ChequeError) -> Self {
        SectorFailure::Cheque(err)
    }
}

impl std::fmt::Display for SectorFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectorFailure::Ledger(err) => write!(f, "{}", err),
            SectorFailure::Loan(err) => write!(f, "{}", err),
            SectorFailure::Cheque(err) => write!(f, "{}", err),
            SectorFailure::Fault(fault) => write!(f, "{}", fault),
            SectorFailure::Policy(reason) => write!(f, "sector policy failure: {}", reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase context
// ---------------------------------------------------------------------------

/// Everything a sector may touch during one phase invocation. Passed
/// explicitly — there is no globally accessible circuit or timer, so
/// independent runs can coexist in one process.
pub struct PhaseContext<'a> {
    /// Name of the phase being executed.
    pub phase: &'a str,
    /// The current period, read-only. Only the runner advances time.
    pub period: Period,
    pub ledger: &'a mut MoneyLedger,
    /// The one seeded random source shared by every sector this run.
    pub rng: &'a mut SharedRng,
    pub loan_terms: LoanTerms,
    /// Collaborator-defined numeric parameters from the run configuration.
    pub params: &'a BTreeMap<String, i64>,
}

impl PhaseContext<'_> {
    pub fn param(&self, name: &str, fallback: i64) -> i64 {
        self.params.get(name).copied().unwrap_or(fallback)
    }
}

// ---------------------------------------------------------------------------
// The capability trait
// ---------------------------------------------------------------------------

pub trait Sector {
    /// Stable name the phase schedule refers to.
    fn name(&self) -> &str;

    /// Whether this sector implements the named phase. A schedule that names
    /// this sector in a phase it does not handle fails at initialization,
    /// before period 0.
    fn handles_phase(&self, phase: &str) -> bool;

    /// Apply this sector's ledger operations for one phase occurrence.
    fn run_phase(&mut self, ctx: &mut PhaseContext<'_>) -> Result<(), SectorFailure>;

    /// Metric names this sector reports, declared once at registration.
    /// Declaration order fixes the slot order.
    fn declared_metrics(&self) -> Vec<String> {
        Vec::new()
    }

    /// Write this period's metric values. Called after the consistency
    /// sweep, never during a phase.
    fn report_metrics(&self, writer: &mut MetricWriter<'_>) {
        let _ = writer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_cash_failure_surfaces_as_consistency_fault() {
        let failure =
            SectorFailure::Cheque(ChequeError::AlreadyCashed("cheque:7".to_string()));
        assert_eq!(
            failure.consistency_fault(),
            Some(ConsistencyFault::ChequeAlreadyCashed {
                cheque_id: "cheque:7".to_string(),
            })
        );
    }

    #[test]
    fn recoverable_failures_carry_no_consistency_fault() {
        let failure = SectorFailure::Ledger(LedgerError::InsufficientFunds {
            account_id: "acct:a1".to_string(),
            requested: 10,
            available: 3,
        });
        assert_eq!(failure.consistency_fault(), None);
        assert_eq!(
            SectorFailure::Policy("no counterparty".to_string()).consistency_fault(),
            None
        );
    }
}
