//! v1 cross-boundary contracts for the monetary circuit kernel, runner,
//! and export collaborators.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod serde_u64_string;

pub const SCHEMA_VERSION_V1: &str = "1.0";

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// One configured phase occurrence: a name plus the sectors that run it,
/// in invocation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseDef {
    pub name: String,
    pub sectors: Vec<String>,
}

impl PhaseDef {
    pub fn new(name: impl Into<String>, sectors: &[&str]) -> Self {
        Self {
            name: name.into(),
            sectors: sectors.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Startup configuration supplied once by the configuration collaborator.
///
/// Rates are integer basis points and terms are whole periods; the kernel
/// performs no floating-point arithmetic anywhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    pub schema_version: String,
    pub run_id: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    /// Total number of periods to simulate, starting at period 0.
    pub periods: u64,
    /// Ordered phase list executed once per period.
    pub phases: Vec<PhaseDef>,
    /// Nominal loan interest rate, basis points per period.
    pub interest_rate_bps: i64,
    /// Rate applied once a loan is past maturity, basis points per period.
    pub penalty_rate_bps: i64,
    /// Periods from issuance to normal maturity.
    pub normal_term_periods: u64,
    /// Additional periods from normal maturity to extended maturity.
    pub extended_term_periods: u64,
    /// Free-form numeric parameters consumed by collaborator sector policy.
    #[serde(default)]
    pub sector_params: BTreeMap<String, i64>,
    pub notes: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_local_001".to_string(),
            seed: 1337,
            periods: 12,
            phases: vec![
                PhaseDef::new("finance", &["banks"]),
                PhaseDef::new("labor", &["firms"]),
                PhaseDef::new("goods", &["households"]),
                PhaseDef::new("settlement", &["firms", "banks"]),
            ],
            interest_rate_bps: 100,
            penalty_rate_bps: 300,
            normal_term_periods: 3,
            extended_term_periods: 3,
            sector_params: BTreeMap::new(),
            notes: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Running,
    Paused,
    /// A consistency violation halted the run; no further periods execute.
    Halted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunStatus {
    pub schema_version: String,
    pub run_id: String,
    /// Periods committed so far; also the index of the next period to run.
    pub current_period: u64,
    pub max_periods: u64,
    pub mode: RunMode,
    /// Last period whose end-of-period sweep passed.
    pub last_consistent_period: Option<u64>,
}

impl RunStatus {
    pub fn is_complete(&self) -> bool {
        self.current_period >= self.max_periods
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={} period={}/{} mode={:?} last_consistent={}",
            self.run_id,
            self.current_period,
            self.max_periods,
            self.mode,
            self.last_consistent_period
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string()),
        )
    }
}

// ---------------------------------------------------------------------------
// Ledger snapshot states
// ---------------------------------------------------------------------------

/// Derived loan standing at a point in time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanStanding {
    Normal,
    Overdue,
    Doubtful,
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChequeStanding {
    Outstanding,
    Cashed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: String,
    pub holder_id: String,
    pub bank_id: String,
    pub balance: i64,
    pub open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoanState {
    pub loan_id: String,
    pub bank_id: String,
    pub borrower_account: String,
    pub principal: i64,
    pub interest_rate_bps: i64,
    pub penalty_rate_bps: i64,
    pub issued_period: u64,
    pub maturity_period: u64,
    pub extended_maturity_period: u64,
    pub last_interest_period: Option<u64>,
    pub standing: LoanStanding,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChequeState {
    pub cheque_id: String,
    pub payer_account: String,
    pub payer_bank: String,
    pub payee_account: String,
    pub amount: i64,
    pub issued_period: u64,
    pub cashed_period: Option<u64>,
    pub standing: ChequeStanding,
}

/// A bank's recorded aggregates. The sweep recomputes each of these from
/// the underlying registries and rejects any drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankBookState {
    pub bank_id: String,
    pub deposit_liability: i64,
    pub cheque_float: i64,
    pub loan_book: i64,
    pub retained_earnings: i64,
}

/// System-wide totals as of the last sweep.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerTotals {
    pub total_assets: i64,
    pub total_liabilities: i64,
    pub deposit_total: i64,
    pub cheque_float_total: i64,
    pub loan_principal_total: i64,
    pub retained_earnings_total: i64,
}

impl LedgerTotals {
    pub fn is_balanced(&self) -> bool {
        self.total_assets == self.total_liabilities
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub schema_version: String,
    pub run_id: String,
    pub period: u64,
    pub accounts: Vec<AccountState>,
    pub loans: Vec<LoanState>,
    pub cheques: Vec<ChequeState>,
    pub banks: Vec<BankBookState>,
    pub totals: LedgerTotals,
}

// ---------------------------------------------------------------------------
// Transfer journal
// ---------------------------------------------------------------------------

/// One journaled monetary movement. The `from`/`to` fields name accounts for
/// deposit transfers and bank or instrument ids for loan and cheque legs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRecord {
    pub transfer_id: String,
    pub period: u64,
    pub phase: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: i64,
    pub cause: Option<String>,
}

// ---------------------------------------------------------------------------
// Metric export
// ---------------------------------------------------------------------------

/// Per-period hand-off to the data export collaborator: metric name to value
/// per sector, plus the sweep totals. The kernel owns no file format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricReport {
    pub schema_version: String,
    pub run_id: String,
    pub period: u64,
    pub sectors: BTreeMap<String, BTreeMap<String, i64>>,
    pub totals: LedgerTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_round_trips_through_json() {
        let config = RunConfig::default();
        let raw = serde_json::to_string(&config).expect("serialize");
        let decoded: RunConfig = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(config, decoded);
    }

    #[test]
    fn run_config_seed_serializes_as_string() {
        let raw = serde_json::to_string(&RunConfig::default()).expect("serialize");
        assert!(raw.contains(r#""seed":"1337""#));
    }

    #[test]
    fn run_status_display_includes_period_and_mode() {
        let status = RunStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_x".to_string(),
            current_period: 3,
            max_periods: 12,
            mode: RunMode::Running,
            last_consistent_period: Some(2),
        };
        let rendered = status.to_string();
        assert!(rendered.contains("period=3/12"));
        assert!(rendered.contains("last_consistent=2"));
    }

    #[test]
    fn run_status_complete_at_max_periods() {
        let mut status = RunStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_x".to_string(),
            current_period: 11,
            max_periods: 12,
            mode: RunMode::Running,
            last_consistent_period: None,
        };
        assert!(!status.is_complete());
        status.current_period = 12;
        assert!(status.is_complete());
    }

    #[test]
    fn metric_report_round_trips_through_json() {
        let mut by_name = BTreeMap::new();
        by_name.insert("wages_paid".to_string(), 1200_i64);
        let mut sectors = BTreeMap::new();
        sectors.insert("firms".to_string(), by_name);
        let report = MetricReport {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_x".to_string(),
            period: 4,
            sectors,
            totals: LedgerTotals::default(),
        };
        let raw = serde_json::to_string(&report).expect("serialize");
        let decoded: MetricReport = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(report, decoded);
    }
}
