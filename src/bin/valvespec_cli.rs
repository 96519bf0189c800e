//! ValveSpec CLI - Bridge interface for the web tier
//!
//! Commands: catalog, resolve, rules, encode, publish, health
//! Outputs JSON to stdout
//! Returns non-zero when a fail-closed gate blocks

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use valvespec_core::{
    calc::SilParameters,
    catalog::{Catalog, CatalogCategory},
    config::ValveConfiguration,
    norms::{NormPack, PackRegistry},
    pipeline::Configurator,
    rules::RuleSet,
    ServiceType, ValveType,
};

#[derive(Parser)]
#[command(name = "valvespec-cli")]
#[command(about = "ValveSpec CLI - Fail-Closed Valve Specification Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of catalog category JSON files (overrides built-ins)
    #[arg(short, long)]
    catalog_dir: Option<PathBuf>,

    /// Norm pack JSON file (defaults to the built-in pack)
    #[arg(short, long)]
    pack_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog items, optionally for one category
    Catalog {
        /// Category file stem (e.g. valve_models)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Resolve applicable norms for a combination
    Resolve {
        /// Valve type code (e.g. ESFERA)
        #[arg(short, long)]
        valve: String,

        /// Service type code (e.g. PIPELINE)
        #[arg(short, long)]
        service: String,
    },

    /// Evaluate field rules over a configuration
    Rules {
        /// JSON payload (ValveConfiguration)
        #[arg(short = 'j', long)]
        payload: String,
    },

    /// Build the IMEX description for a configuration
    Encode {
        /// JSON payload (ValveConfiguration)
        #[arg(short = 'j', long)]
        payload: String,
    },

    /// Run the fail-closed publication validator
    Publish {
        /// JSON payload (ValveConfiguration)
        #[arg(short = 'j', long)]
        payload: String,

        /// Dangerous undetected failure rate for the SIL assessment
        #[arg(long)]
        lambda_du: Option<f64>,
    },

    /// Check norm catalog health
    Health,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let catalog = match &cli.catalog_dir {
        Some(dir) => match Catalog::load_from_dir(dir) {
            Ok(c) => c,
            Err(e) => {
                eprintln!(r#"{{"error": "Failed to load catalog: {}"}}"#, e);
                return ExitCode::FAILURE;
            }
        },
        None => Catalog::builtin(),
    };

    let pack = match &cli.pack_file {
        Some(path) => match NormPack::load_from_file(path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!(r#"{{"error": "Failed to load norm pack: {}"}}"#, e);
                return ExitCode::FAILURE;
            }
        },
        None => NormPack::builtin(),
    };

    let configurator =
        match Configurator::new(catalog, PackRegistry::new(vec![pack]), RuleSet::builtin()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!(r#"{{"error": "{}"}}"#, e);
                return ExitCode::FAILURE;
            }
        };

    match cli.command {
        Commands::Catalog { category } => {
            let categories: Vec<CatalogCategory> = match category.as_deref() {
                Some(stem) => match CatalogCategory::from_file_stem(stem) {
                    Some(c) => vec![c],
                    None => {
                        eprintln!(r#"{{"error": "Unknown category: {}"}}"#, stem);
                        return ExitCode::FAILURE;
                    }
                },
                None => CatalogCategory::ALL.to_vec(),
            };
            let listing: serde_json::Map<String, serde_json::Value> = categories
                .iter()
                .map(|c| {
                    (
                        c.file_stem().to_string(),
                        serde_json::json!(configurator.catalog().items(*c)),
                    )
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Resolve { valve, service } => {
            let valve: ValveType = match serde_json::from_value(serde_json::json!(valve)) {
                Ok(v) => v,
                Err(_) => {
                    eprintln!(r#"{{"error": "Unknown valve type"}}"#);
                    return ExitCode::FAILURE;
                }
            };
            let service: ServiceType = match serde_json::from_value(serde_json::json!(service)) {
                Ok(s) => s,
                Err(_) => {
                    eprintln!(r#"{{"error": "Unknown service type"}}"#);
                    return ExitCode::FAILURE;
                }
            };
            match configurator.resolve_norms(Some(valve), Some(service)) {
                Ok(resolution) => {
                    println!("{}", serde_json::to_string_pretty(&resolution).unwrap());
                    if resolution.is_valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2) // No construction standard: blocked
                    }
                }
                Err(e) => {
                    eprintln!(r#"{{"error": "{}"}}"#, e);
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Rules { payload } => {
            let config: ValveConfiguration = match serde_json::from_str(&payload) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(r#"{{"error": "Invalid payload: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let evaluation = configurator.evaluate_rules(&config);
            println!("{}", serde_json::to_string_pretty(&evaluation).unwrap());
            if evaluation.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Encode { payload } => {
            let config: ValveConfiguration = match serde_json::from_str(&payload) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(r#"{{"error": "Invalid payload: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let build = configurator.build_imex_code(&config);
            println!("{}", serde_json::to_string_pretty(&build).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Publish { payload, lambda_du } => {
            let config: ValveConfiguration = match serde_json::from_str(&payload) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(r#"{{"error": "Invalid payload: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let sil = lambda_du.map(|lambda_du| {
                configurator.calculate_sil(
                    &SilParameters {
                        lambda_du,
                        ..Default::default()
                    },
                    config.sil_required(),
                )
            });
            match configurator.validate_for_publication(&config, sil.as_ref()) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result).unwrap());
                    if result.can_publish {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2) // Publication blocked
                    }
                }
                Err(e) => {
                    eprintln!(r#"{{"error": "{}"}}"#, e);
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Health => {
            let report = configurator.health_check();
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
            if report.blocks_new_configurations() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}
