//! The circuit: owns the timer, the money ledger, the shared random source,
//! and the registered sectors, and drives configured phases through
//! strictly sequential periods.

mod snapshot;
mod step;

use std::collections::{BTreeMap, BTreeSet};

use contracts::{RunConfig, RunMode, RunStatus, SCHEMA_VERSION_V1};

use crate::consistency::ConsistencyViolation;
use crate::ledger::MoneyLedger;
use crate::metrics::MetricSchema;
use crate::period::{Period, Timer};
use crate::rng::SharedRng;
use crate::schedule::{self, InitError};
use crate::sector::{Sector, SectorFailure};

pub use step::{PeriodMetrics, PeriodOutcome};

// ---------------------------------------------------------------------------
// Run-time error type
// ---------------------------------------------------------------------------

/// Fatal failures while periods are running. Initialization failures are
/// `InitError` and happen before period 0.
#[derive(Debug)]
pub enum RunError {
    /// A conservation invariant broke, in a phase or in the sweep. The run
    /// is halted; nothing is retried or rolled back.
    Consistency(ConsistencyViolation),
    /// A sector propagated a failure it chose not to absorb.
    SectorFailed {
        period: Period,
        phase: String,
        sector: String,
        failure: SectorFailure,
    },
    /// Stepping a circuit that a previous violation already halted.
    Halted,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Consistency(violation) => write!(f, "{}", violation),
            RunError::SectorFailed {
                period,
                phase,
                sector,
                failure,
            } => write!(
                f,
                "period {} phase {}: sector {} failed: {}",
                period, phase, sector, failure
            ),
            RunError::Halted => write!(f, "run already halted by a prior violation"),
        }
    }
}

impl std::error::Error for RunError {}

// ---------------------------------------------------------------------------
// Circuit
// ---------------------------------------------------------------------------

pub struct Circuit {
    config: RunConfig,
    status: RunStatus,
    timer: Timer,
    ledger: MoneyLedger,
    rng: SharedRng,
    sectors: BTreeMap<String, Box<dyn Sector>>,
    metric_schema: MetricSchema,
    /// Sector names the schedule mentions but nothing registered: their
    /// phase slots are skipped, by design.
    skipped_sectors: BTreeSet<String>,
    last_period_metrics: PeriodMetrics,
}

impl std::fmt::Debug for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Circuit")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("timer", &self.timer)
            .field("ledger", &self.ledger)
            .field("rng", &self.rng)
            .field("sectors", &self.sectors.keys().collect::<Vec<_>>())
            .field("metric_schema", &self.metric_schema)
            .field("skipped_sectors", &self.skipped_sectors)
            .field("last_period_metrics", &self.last_period_metrics)
            .finish()
    }
}

impl Circuit {
    /// Validate the configuration and the registered sectors, and build a
    /// circuit positioned before period 0. All schedule/capability problems
    /// surface here; the run never starts on a bad configuration.
    pub fn new(config: RunConfig, sectors: Vec<Box<dyn Sector>>) -> Result<Self, InitError> {
        schedule::validate_config(&config)?;

        let mut registry: BTreeMap<String, Box<dyn Sector>> = BTreeMap::new();
        for sector in sectors {
            let name = sector.name().to_string();
            if registry.contains_key(&name) {
                return Err(InitError::DuplicateSector { sector: name });
            }
            registry.insert(name, sector);
        }

        // A registered sector named in a phase it cannot handle is a
        // configuration fault. An unregistered name is merely skipped.
        let mut skipped_sectors = BTreeSet::new();
        for phase in &config.phases {
            for sector_name in &phase.sectors {
                match registry.get(sector_name) {
                    Some(sector) if !sector.handles_phase(&phase.name) => {
                        return Err(InitError::MissingCapability {
                            sector: sector_name.clone(),
                            phase: phase.name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        skipped_sectors.insert(sector_name.clone());
                    }
                }
            }
        }

        let mut metric_schema = MetricSchema::new();
        for (name, sector) in &registry {
            metric_schema.declare(name, sector.declared_metrics());
        }

        let status = RunStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: config.run_id.clone(),
            current_period: 0,
            max_periods: config.periods,
            mode: RunMode::Paused,
            last_consistent_period: None,
        };
        let rng = SharedRng::new(config.seed);

        Ok(Self {
            config,
            status,
            timer: Timer::new(),
            ledger: MoneyLedger::new(),
            rng,
            sectors: registry,
            metric_schema,
            skipped_sectors,
            last_period_metrics: PeriodMetrics::default(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.status.run_id
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// The period the timer currently points at: the one being executed, or
    /// the last executed once a step returns.
    pub fn current_period(&self) -> Period {
        self.timer.current()
    }

    pub fn ledger(&self) -> &MoneyLedger {
        &self.ledger
    }

    /// Setup seam for the configuration collaborator: banks, accounts, and
    /// opening positions are laid down here before the first step. The
    /// end-of-period sweep guards against abuse.
    pub fn ledger_mut(&mut self) -> &mut MoneyLedger {
        &mut self.ledger
    }

    pub fn journal(&self) -> &[contracts::TransferRecord] {
        &self.ledger.journal
    }

    pub fn skipped_sectors(&self) -> &BTreeSet<String> {
        &self.skipped_sectors
    }

    pub fn last_period_metrics(&self) -> PeriodMetrics {
        self.last_period_metrics
    }
}
