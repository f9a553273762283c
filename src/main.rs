use anyhow::Context;
use sams_core::constants::{
    ENV_CREDENTIALS_FILE, ENV_ONSET, ENV_PASSWORD, ENV_SAMS_URL, ENV_TIMEOUT_SECS, ENV_USERNAME,
};
use sams_core::{
    client_config_from_env_values, extract_disease_terms_from_phenopacket,
    extract_hpo_terms_from_phenopacket, OnsetSelector, SessionManager,
};
use serde::Serialize;
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One output line per patient.
#[derive(Serialize)]
struct PatientSummary<'a> {
    id: &'a str,
    /// `None` when the phenopacket has no `phenotypicFeatures`.
    hpo_terms: Option<String>,
    /// `None` when the phenopacket has no `diseases`.
    disease_terms: Option<String>,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Batch export of every phenopacket visible to a SAMS account.
///
/// Logs in, fetches all phenopackets, optionally narrows each to one onset, and writes one JSON
/// line per patient with its HPO and disease term summaries to stdout.
///
/// # Environment Variables
/// - `SAMS_URL`: service base URL (default: "https://www.genecascade.org/sams-cgi")
/// - `SAMS_TIMEOUT_SECS`: request timeout in seconds (default: 30)
/// - `SAMS_CREDENTIALS_FILE`: file with username on line 1 and password on line 2
/// - `SAMS_USERNAME` / `SAMS_PASSWORD`: used when no credentials file is set
/// - `SAMS_ONSET`: optional onset filter ("earliest", "latest", or a concrete onset)
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sams_core=info".parse()?)
                .add_directive("phenopacket=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = client_config_from_env_values(env_value(ENV_SAMS_URL), env_value(ENV_TIMEOUT_SECS))?;
    tracing::info!("++ Connecting to SAMS at {}", cfg.base_url());

    let mut manager = SessionManager::connect(cfg)?;
    match env_value(ENV_CREDENTIALS_FILE) {
        Some(path) => manager.login_with_credentials_file(path)?,
        None => {
            let username = env_value(ENV_USERNAME)
                .with_context(|| format!("set {ENV_CREDENTIALS_FILE} or {ENV_USERNAME}"))?;
            let password =
                env_value(ENV_PASSWORD).with_context(|| format!("{ENV_PASSWORD} is not set"))?;
            manager.login_with_username(&username, &password)?;
        }
    }

    let selector = env_value(ENV_ONSET)
        .map(|v| v.parse::<OnsetSelector>())
        .transpose()?;

    let phenopackets = manager.get_phenopackets()?;
    let mut stdout = std::io::stdout().lock();

    for phenopacket in &phenopackets {
        let filtered;
        let phenopacket = match &selector {
            Some(selector) => match selector.apply(phenopacket) {
                Ok(narrowed) => {
                    filtered = narrowed;
                    &filtered
                }
                Err(e) => {
                    tracing::warn!("skipping {}: {}", phenopacket.display_id(), e);
                    continue;
                }
            },
            None => phenopacket,
        };

        let summary = PatientSummary {
            id: phenopacket.display_id(),
            hpo_terms: extract_hpo_terms_from_phenopacket(phenopacket, true).ok(),
            disease_terms: extract_disease_terms_from_phenopacket(phenopacket, true).ok(),
        };
        serde_json::to_writer(&mut stdout, &summary)?;
        writeln!(stdout)?;
    }

    tracing::info!("++ Exported {} phenopackets", phenopackets.len());
    manager.logout();

    Ok(())
}
