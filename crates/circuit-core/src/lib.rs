//! Monetary circuit simulation kernel.
//!
//! A run is a sequence of strictly sequential periods; within each period an
//! explicitly configured, ordered list of phases executes across the
//! registered sectors. Sectors exchange monetary claims — deposit balances,
//! loans, cheques — through the [`ledger::MoneyLedger`], whose operations
//! update per-bank aggregates in the same logical step as every balance
//! movement. The end-of-period [`consistency`] sweep recomputes every
//! aggregate and the global assets-equal-liabilities identity with zero
//! tolerance; any violation halts the run.
//!
//! All amounts are integer minor-currency units and all rates are integer
//! basis points: the kernel performs no floating-point arithmetic.

pub mod cheque;
pub mod circuit;
pub mod consistency;
pub mod export;
pub mod ledger;
pub mod loan;
pub mod metrics;
pub mod period;
pub mod rng;
pub mod schedule;
pub mod sector;

pub use cheque::{Cheque, ChequeError};
pub use circuit::{Circuit, PeriodMetrics, PeriodOutcome, RunError};
pub use consistency::{verify_ledger, ConsistencyFault, ConsistencyViolation};
pub use export::{CollectingExporter, JsonLinesExporter, MetricExporter};
pub use ledger::{Account, BankBook, LedgerError, MoneyLedger};
pub use loan::{Loan, LoanError, LoanTerms};
pub use metrics::{MetricSchema, MetricWriter};
pub use period::{Period, Timer};
pub use rng::SharedRng;
pub use schedule::InitError;
pub use sector::{PhaseContext, Sector, SectorFailure};
