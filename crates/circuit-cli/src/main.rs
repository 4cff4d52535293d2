use std::env;
use std::io::Write;

use circuit_core::circuit::Circuit;
use circuit_core::export::JsonLinesExporter;
use circuit_core::sector::Sector;
use contracts::RunConfig;

mod sectors;

use sectors::{BankSector, FirmSector, HouseholdSector};

fn print_usage() {
    println!("circuit-cli <command>");
    println!("commands:");
    println!("  run <run_id> <seed> [periods]");
    println!("    runs the demo scenario and prints one metric report per period");
    println!("  config");
    println!("    prints the default run configuration as JSON");
    println!("  schedule");
    println!("    prints the default phase schedule");
}

fn parse_seed(value: Option<&String>) -> Result<u64, String> {
    let raw = value.ok_or_else(|| "missing seed".to_string())?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid seed: {raw}"))
}

fn parse_periods(value: Option<&String>, fallback: u64) -> Result<u64, String> {
    match value {
        None => Ok(fallback),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| format!("invalid periods: {raw}")),
    }
}

/// Build the demo scenario: one bank, two firms, four households, all
/// accounts at the one bank, opening positions created by credit lines in
/// the first finance phase.
fn demo_circuit(config: RunConfig) -> Result<Circuit, String> {
    let firm_accounts = vec!["acct:firm:1".to_string(), "acct:firm:2".to_string()];
    let household_accounts: Vec<String> =
        (1..=4).map(|i| format!("acct:household:{i}")).collect();

    let sectors: Vec<Box<dyn Sector>> = vec![
        Box::new(BankSector::new("bank:central", firm_accounts.clone())),
        Box::new(FirmSector::new(
            firm_accounts.clone(),
            household_accounts.clone(),
        )),
        Box::new(HouseholdSector::new(
            household_accounts.clone(),
            firm_accounts.clone(),
        )),
    ];
    let mut circuit =
        Circuit::new(config, sectors).map_err(|err| format!("invalid configuration: {err}"))?;

    let ledger = circuit.ledger_mut();
    ledger
        .open_bank("bank:central")
        .map_err(|err| err.to_string())?;
    for account in firm_accounts.iter() {
        ledger
            .open_account(account.clone(), "agent:firm", "bank:central")
            .map_err(|err| err.to_string())?;
    }
    for account in household_accounts.iter() {
        ledger
            .open_account(account.clone(), "agent:household", "bank:central")
            .map_err(|err| err.to_string())?;
    }
    Ok(circuit)
}

fn run_demo(args: &[String]) -> Result<(), String> {
    let run_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing run_id".to_string())?;
    let seed = parse_seed(args.get(3))?;
    let periods = parse_periods(args.get(4), RunConfig::default().periods)?;

    let mut config = RunConfig::default();
    config.run_id = run_id;
    config.seed = seed;
    config.periods = periods;

    let mut circuit = demo_circuit(config)?;
    let stdout = std::io::stdout();
    let mut exporter = JsonLinesExporter::new(stdout.lock());

    let status = circuit
        .run(&mut exporter)
        .map_err(|err| format!("run aborted: {err}"))?;
    if let Some(err) = exporter.last_error() {
        return Err(format!("export error after simulation: {err}"));
    }
    let mut out = exporter.into_inner();
    let _ = writeln!(out, "{status}");
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("run") => {
            if let Err(err) = run_demo(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("config") => {
            let rendered = serde_json::to_string_pretty(&RunConfig::default())
                .expect("default config serializes");
            println!("{rendered}");
        }
        Some("schedule") => {
            for phase in &RunConfig::default().phases {
                println!("{}: {}", phase.name, phase.sectors.join(", "));
            }
        }
        _ => {
            print_usage();
        }
    }
}
