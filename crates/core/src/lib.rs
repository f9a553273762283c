//! # SAMS Core
//!
//! Client-side business logic for the SAMS phenotype-annotation service.
//!
//! This crate contains:
//! - the [`SessionManager`]: login state plus fetch-all / fetch-one
//! - the [`Transport`] seam and its blocking HTTP implementation
//! - credentials file handling and startup configuration
//!
//! **No document logic**: parsing, term extraction and onset filtering live in the
//! `phenopacket` crate and are re-exported here for convenience.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod session;
pub mod transport;

pub use config::{client_config_from_env_values, timeout_from_env_value, ClientConfig};
pub use credentials::Credentials;
pub use error::{SamsError, SamsResult};
pub use session::SessionManager;
pub use transport::{HttpTransport, Session, Transport, TransportError};

pub use phenopacket::{
    extract_disease_terms_from_phenopacket, extract_disease_terms_with,
    extract_hpo_terms_from_phenopacket, extract_hpo_terms_with, filter_phenopacket_by_onset,
    ExtractOptions, OnsetSelector, Phenopacket,
};
