use clap::{Args, Parser, Subcommand};
use sams_core::{
    client_config_from_env_values, extract_disease_terms_with, extract_hpo_terms_with,
    ExtractOptions, OnsetSelector, Phenopacket, SamsError, SamsResult, SessionManager,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sams")]
#[command(about = "SAMS phenopacket client CLI")]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Connection {
    /// SAMS base URL
    #[arg(long, env = "SAMS_URL")]
    url: Option<String>,
    /// Request timeout in seconds
    #[arg(long, env = "SAMS_TIMEOUT_SECS")]
    timeout: Option<String>,
    /// File with username on line 1 and password on line 2
    #[arg(long, env = "SAMS_CREDENTIALS_FILE")]
    credentials_file: Option<PathBuf>,
    /// Username (used when no credentials file is given)
    #[arg(long, env = "SAMS_USERNAME")]
    username: Option<String>,
    /// Password (used when no credentials file is given)
    #[arg(long, env = "SAMS_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args)]
struct TermArgs {
    /// SAMS external patient id
    patient_id: String,
    /// Include entries flagged as excluded
    #[arg(long)]
    include_excluded: bool,
    /// Append "(excluded)" to excluded entries that are included
    #[arg(long)]
    mark_excluded: bool,
    /// Keep only entries with this onset ("earliest", "latest", or a value)
    #[arg(long)]
    onset: Option<OnsetSelector>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the credentials are accepted
    Login,
    /// List all patients with their HPO terms
    List,
    /// Print a patient's phenopacket as JSON
    Show {
        /// SAMS external patient id
        patient_id: String,
        /// Keep only entries with this onset ("earliest", "latest", or a value)
        #[arg(long)]
        onset: Option<OnsetSelector>,
    },
    /// Print a patient's HPO terms
    Hpo(TermArgs),
    /// Print a patient's disease terms (OMIM, ORPHANET)
    Diseases(TermArgs),
}

fn login(connection: &Connection) -> SamsResult<SessionManager> {
    let cfg = client_config_from_env_values(connection.url.clone(), connection.timeout.clone())?;
    let mut manager = SessionManager::connect(cfg)?;

    match (&connection.credentials_file, &connection.username, &connection.password) {
        (Some(path), _, _) => manager.login_with_credentials_file(path)?,
        (None, Some(username), Some(password)) => {
            manager.login_with_username(username, password)?
        }
        _ => {
            return Err(SamsError::Configuration(
                "provide --credentials-file or both --username and --password".into(),
            ))
        }
    }

    Ok(manager)
}

fn fetch(
    connection: &Connection,
    patient_id: &str,
    onset: Option<&OnsetSelector>,
) -> SamsResult<Phenopacket> {
    let mut manager = login(connection)?;
    let phenopacket = manager.get_phenopacket(patient_id)?;
    match onset {
        Some(selector) => Ok(selector.apply(&phenopacket)?),
        None => Ok(phenopacket),
    }
}

fn options(args: &TermArgs) -> ExtractOptions {
    ExtractOptions {
        ignore_excluded: !args.include_excluded,
        mark_excluded: args.mark_excluded,
    }
}

/// HPO terms for the `list` output; a document without `phenotypicFeatures` is marked as such.
fn hpo_summary(phenopacket: &Phenopacket) -> String {
    match extract_hpo_terms_with(phenopacket, ExtractOptions::default()) {
        Ok(terms) => terms,
        Err(_) => "(no phenotypicFeatures)".to_owned(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Login) => match login(&cli.connection) {
            Ok(_) => println!("Logged in."),
            Err(e) => eprintln!("Error logging in: {}", e),
        },
        Some(Commands::List) => {
            let result = login(&cli.connection).and_then(|mut m| m.get_phenopackets());
            match result {
                Ok(phenopackets) if phenopackets.is_empty() => println!("No phenopackets found."),
                Ok(phenopackets) => {
                    for phenopacket in phenopackets {
                        println!(
                            "ID: {}, HPO: {}",
                            phenopacket.display_id(),
                            hpo_summary(&phenopacket)
                        );
                    }
                }
                Err(e) => eprintln!("Error listing phenopackets: {}", e),
            }
        }
        Some(Commands::Show { patient_id, onset }) => {
            let rendered = fetch(&cli.connection, &patient_id, onset.as_ref())
                .and_then(|p| Ok(p.render()?));
            match rendered {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error fetching phenopacket {}: {}", patient_id, e),
            }
        }
        Some(Commands::Hpo(args)) => {
            let terms = fetch(&cli.connection, &args.patient_id, args.onset.as_ref())
                .and_then(|p| Ok(extract_hpo_terms_with(&p, options(&args))?));
            match terms {
                Ok(terms) => println!("{}", terms),
                Err(e) => eprintln!("Error extracting HPO terms: {}", e),
            }
        }
        Some(Commands::Diseases(args)) => {
            let terms = fetch(&cli.connection, &args.patient_id, args.onset.as_ref())
                .and_then(|p| Ok(extract_disease_terms_with(&p, options(&args))?));
            match terms {
                Ok(terms) => println!("{}", terms),
                Err(e) => eprintln!("Error extracting disease terms: {}", e),
            }
        }
        None => {
            println!("Use 'sams --help' for commands");
        }
    }

    Ok(())
}
