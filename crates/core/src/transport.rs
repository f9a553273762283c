//! Transport to the SAMS service.
//!
//! [`Transport`] is the seam between the session manager and the network. [`HttpTransport`] is
//! the production implementation: blocking `reqwest` calls against the SAMS CGI endpoints, with
//! the session carried in the `SAMSI` cookie. Redirects are never followed: a login redirect must
//! expose its `Set-Cookie` header, and a redirect on a fetch means the session has expired.

use crate::config::ClientConfig;
use crate::constants::{
    EXPORT_PHENOPACKETS_PATH, EXPORT_PHENOPACKET_BY_ID_PATH, LOGIN_PATH, SESSION_COOKIE,
};
use crate::credentials::Credentials;
use crate::{SamsError, SamsResult};
use phenopacket::{Phenopacket, PhenopacketError};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Failures reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("credentials rejected")]
    Rejected,
    #[error("session expired")]
    SessionExpired,
    #[error("no phenopacket for external id {0}")]
    NotFound(String),
    #[error("could not connect to {0}")]
    Connection(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("SAMS returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("HTTP client error: {0}")]
    Http(String),
    #[error(transparent)]
    Malformed(#[from] PhenopacketError),
}

/// An authenticated SAMS session.
pub struct Session {
    token: SecretString,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    /// Value for the `Cookie` request header.
    fn cookie_header(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.token.expose_secret())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"[REDACTED]").finish()
    }
}

/// Authenticated request/response access to SAMS.
///
/// Documents come back already parsed into [`Phenopacket`] records.
pub trait Transport {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session, TransportError>;

    fn fetch_all(&self, session: &Session) -> Result<Vec<Phenopacket>, TransportError>;

    fn fetch_one(&self, session: &Session, patient_id: &str)
        -> Result<Phenopacket, TransportError>;
}

/// Blocking HTTP transport for the SAMS CGI endpoints.
#[derive(Debug)]
pub struct HttpTransport {
    config: ClientConfig,
    client: Client,
}

impl HttpTransport {
    /// Build a transport for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SamsError::Configuration`] if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> SamsResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(Policy::none())
            .build()
            .map_err(|e| SamsError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_connect() {
            TransportError::Connection(self.config.base_url().to_string())
        } else if err.is_timeout() {
            TransportError::Timeout(self.config.timeout().as_secs())
        } else {
            TransportError::Http(err.to_string())
        }
    }

    /// Authenticated GET; redirects and 401/403 mean the session is gone.
    fn get(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, TransportError> {
        let url = self.config.endpoint(path);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(COOKIE, session.cookie_header())
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status.is_redirection()
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
        {
            return Err(TransportError::SessionExpired);
        }

        Ok(response)
    }

    fn body(&self, response: Response) -> Result<String, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.text().map_err(|e| self.request_error(e))
    }
}

impl Transport for HttpTransport {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session, TransportError> {
        let url = self.config.endpoint(LOGIN_PATH);
        tracing::debug!("POST {} as {}", url, credentials.username());

        let form = [
            ("email", credentials.username()),
            ("password", credentials.password().expose_secret()),
        ];
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::Rejected);
        }
        if !status.is_success() && !status.is_redirection() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        session_cookie(response.headers())
            .map(Session::new)
            .ok_or(TransportError::Rejected)
    }

    fn fetch_all(&self, session: &Session) -> Result<Vec<Phenopacket>, TransportError> {
        let response = self.get(session, EXPORT_PHENOPACKETS_PATH, &[("export_all", "1")])?;
        let body = self.body(response)?;
        Ok(Phenopacket::parse_many(&body)?)
    }

    fn fetch_one(
        &self,
        session: &Session,
        patient_id: &str,
    ) -> Result<Phenopacket, TransportError> {
        let response = self.get(
            session,
            EXPORT_PHENOPACKET_BY_ID_PATH,
            &[("external_id", patient_id)],
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(patient_id.to_string()));
        }

        let body = self.body(response)?;
        let phenopacket = Phenopacket::parse(&body)?;

        // A record for a different subject means the requested id is unknown.
        if phenopacket.subject_id() != Some(patient_id) {
            return Err(TransportError::NotFound(patient_id.to_string()));
        }

        Ok(phenopacket)
    }
}

/// Value of the session cookie among `Set-Cookie` headers, if SAMS set one.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            let value = value.trim().trim_matches('"');
            (name.trim() == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}
