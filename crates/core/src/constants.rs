//! Constants used throughout the SAMS core crate.
//!
//! Endpoint paths, cookie names and environment variable names live here so the transport,
//! configuration and binaries agree on them.

/// Base URL of the public SAMS CGI endpoints.
pub const DEFAULT_SAMS_URL: &str = "https://www.genecascade.org/sams-cgi";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Login form endpoint (POST `email`, `password`).
pub const LOGIN_PATH: &str = "login.cgi";

/// Bulk export of every phenopacket visible to the user.
pub const EXPORT_PHENOPACKETS_PATH: &str = "ExportPhenopacket.cgi";

/// Export of a single phenopacket by external id.
pub const EXPORT_PHENOPACKET_BY_ID_PATH: &str = "export_phenopacket.cgi";

/// Cookie SAMS sets on a successful login.
pub const SESSION_COOKIE: &str = "SAMSI";

/// Environment variable overriding the service base URL.
pub const ENV_SAMS_URL: &str = "SAMS_URL";

/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "SAMS_TIMEOUT_SECS";

pub const ENV_CREDENTIALS_FILE: &str = "SAMS_CREDENTIALS_FILE";
pub const ENV_USERNAME: &str = "SAMS_USERNAME";
pub const ENV_PASSWORD: &str = "SAMS_PASSWORD";
pub const ENV_ONSET: &str = "SAMS_ONSET";
