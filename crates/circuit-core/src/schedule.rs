//! Startup validation of the run configuration and phase schedule.
//!
//! Malformed configuration fails here, before period 0 begins: the run
//! never starts.

use std::collections::BTreeSet;

use contracts::RunConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    EmptySchedule,
    ZeroPeriods,
    EmptyPhaseName { position: usize },
    PhaseNamesNoSectors { phase: String },
    NegativeRate { field: &'static str, value: i64 },
    ZeroNormalTerm,
    /// A registered sector is named in a phase it does not handle.
    MissingCapability { sector: String, phase: String },
    DuplicateSector { sector: String },
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::EmptySchedule => write!(f, "phase schedule is empty"),
            InitError::ZeroPeriods => write!(f, "run length is zero periods"),
            InitError::EmptyPhaseName { position } => {
                write!(f, "phase at position {} has an empty name", position)
            }
            InitError::PhaseNamesNoSectors { phase } => {
                write!(f, "phase {} names no sectors", phase)
            }
            InitError::NegativeRate { field, value } => {
                write!(f, "{} is negative: {}", field, value)
            }
            InitError::ZeroNormalTerm => write!(f, "normal loan term is zero periods"),
            InitError::MissingCapability { sector, phase } => write!(
                f,
                "sector {} does not handle configured phase {}",
                sector, phase
            ),
            InitError::DuplicateSector { sector } => {
                write!(f, "sector registered twice: {}", sector)
            }
        }
    }
}

impl std::error::Error for InitError {}

/// Structural checks on the configuration alone. Capability checks against
/// the registered sectors happen at circuit construction, once both sides
/// are known.
pub fn validate_config(config: &RunConfig) -> Result<(), InitError> {
    if config.periods == 0 {
        return Err(InitError::ZeroPeriods);
    }
    if config.phases.is_empty() {
        return Err(InitError::EmptySchedule);
    }
    for (position, phase) in config.phases.iter().enumerate() {
        if phase.name.trim().is_empty() {
            return Err(InitError::EmptyPhaseName { position });
        }
        if phase.sectors.is_empty() {
            return Err(InitError::PhaseNamesNoSectors {
                phase: phase.name.clone(),
            });
        }
    }
    if config.interest_rate_bps < 0 {
        return Err(InitError::NegativeRate {
            field: "interest_rate_bps",
            value: config.interest_rate_bps,
        });
    }
    if config.penalty_rate_bps < 0 {
        return Err(InitError::NegativeRate {
            field: "penalty_rate_bps",
            value: config.penalty_rate_bps,
        });
    }
    if config.normal_term_periods == 0 {
        return Err(InitError::ZeroNormalTerm);
    }
    Ok(())
}

/// The distinct sector names the schedule mentions, for skip accounting.
pub fn scheduled_sectors(config: &RunConfig) -> BTreeSet<String> {
    config
        .phases
        .iter()
        .flat_map(|phase| phase.sectors.iter().cloned())
        .collect()
}
