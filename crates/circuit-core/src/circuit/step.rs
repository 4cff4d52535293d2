use contracts::MetricReport;

use super::*;
use crate::consistency;
use crate::export::MetricExporter;
use crate::loan::LoanTerms;
use crate::sector::PhaseContext;

/// Counters for the most recently executed period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodMetrics {
    pub phases_run: u64,
    pub sector_invocations: u64,
    pub transfers_recorded: u64,
}

/// One committed period: its index and the report handed to the export
/// collaborator.
#[derive(Debug, Clone)]
pub struct PeriodOutcome {
    pub period: u64,
    pub report: MetricReport,
}

impl Circuit {
    pub fn start(&mut self) {
        if self.status.mode != RunMode::Halted && !self.status.is_complete() {
            self.status.mode = RunMode::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.status.mode != RunMode::Halted {
            self.status.mode = RunMode::Paused;
        }
    }

    /// Execute exactly one period: every configured phase in order, then the
    /// consistency sweep, then the metric report. Returns `Ok(None)` once
    /// the run is complete.
    ///
    /// Phases are strictly sequential — phase k's ledger effects are fully
    /// applied before phase k+1 begins — and so are periods: the timer
    /// advances exactly once, here, between periods.
    pub fn step(&mut self) -> Result<Option<PeriodOutcome>, RunError> {
        if self.status.mode == RunMode::Halted {
            return Err(RunError::Halted);
        }
        if self.status.is_complete() {
            self.status.mode = RunMode::Paused;
            return Ok(None);
        }
        self.status.mode = RunMode::Running;

        // Period 0 runs at the timer's initial position; every later period
        // begins with the single sanctioned advance.
        if self.status.current_period > 0 {
            self.timer.advance();
        }
        let period = self.timer.current();
        let journal_mark = self.ledger.journal.len();
        let mut metrics = PeriodMetrics::default();

        let phases = self.config.phases.clone();
        let loan_terms = LoanTerms::from(&self.config);
        for phase in &phases {
            metrics.phases_run += 1;
            for sector_name in &phase.sectors {
                let Some(sector) = self.sectors.get_mut(sector_name) else {
                    // Absent from this configuration: skipped.
                    continue;
                };
                metrics.sector_invocations += 1;
                let mut ctx = PhaseContext {
                    phase: &phase.name,
                    period,
                    ledger: &mut self.ledger,
                    rng: &mut self.rng,
                    loan_terms,
                    params: &self.config.sector_params,
                };
                if let Err(failure) = sector.run_phase(&mut ctx) {
                    self.status.mode = RunMode::Halted;
                    return Err(match failure.consistency_fault() {
                        Some(fault) => RunError::Consistency(ConsistencyViolation {
                            period,
                            phase: Some(phase.name.clone()),
                            fault,
                        }),
                        None => RunError::SectorFailed {
                            period,
                            phase: phase.name.clone(),
                            sector: sector_name.clone(),
                            failure,
                        },
                    });
                }
            }
        }

        let totals = match consistency::verify_ledger(&self.ledger) {
            Ok(totals) => totals,
            Err(fault) => {
                self.status.mode = RunMode::Halted;
                return Err(RunError::Consistency(ConsistencyViolation {
                    period,
                    phase: None,
                    fault,
                }));
            }
        };

        self.status.last_consistent_period = Some(period.index());
        self.status.current_period += 1;
        metrics.transfers_recorded = (self.ledger.journal.len() - journal_mark) as u64;
        self.last_period_metrics = metrics;
        if self.status.is_complete() {
            self.status.mode = RunMode::Paused;
        }

        let report = self.build_report(period, totals);
        Ok(Some(PeriodOutcome {
            period: period.index(),
            report,
        }))
    }

    /// Step up to `n` periods; stops early when the run completes. Returns
    /// the committed outcomes.
    pub fn step_n(&mut self, n: u64) -> Result<Vec<PeriodOutcome>, RunError> {
        let mut outcomes = Vec::new();
        for _ in 0..n {
            match self.step()? {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        Ok(outcomes)
    }

    /// Step until `target` periods are committed (or the run completes).
    pub fn run_to_period(&mut self, target: u64) -> Result<Vec<PeriodOutcome>, RunError> {
        let mut outcomes = Vec::new();
        while self.status.current_period < target {
            match self.step()? {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        Ok(outcomes)
    }

    /// Drive the run to completion, handing each period's report to the
    /// export collaborator as it commits.
    pub fn run(&mut self, exporter: &mut dyn MetricExporter) -> Result<RunStatus, RunError> {
        while let Some(outcome) = self.step()? {
            exporter.export_period(&outcome.report);
        }
        Ok(self.status.clone())
    }

    fn build_report(&self, period: Period, totals: contracts::LedgerTotals) -> MetricReport {
        let mut sectors = BTreeMap::new();
        for (name, sector) in &self.sectors {
            if let Some(mut writer) = self.metric_schema.writer_for(name) {
                sector.report_metrics(&mut writer);
                sectors.insert(name.clone(), writer.finish());
            }
        }
        MetricReport {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: self.status.run_id.clone(),
            period: period.index(),
            sectors,
            totals,
        }
    }
}
