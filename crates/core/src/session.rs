//! Session manager.
//!
//! Owns the login state for one SAMS account and exposes the fetch operations. Each manager holds
//! its own [`Session`], so a process can keep several independent logins.
//!
//! State machine: `LoggedOut` -> `LoggedIn` only through a successful login. A failed login, an
//! explicit [`SessionManager::logout`], or the transport reporting an expired session returns the
//! manager to `LoggedOut`.

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::transport::{HttpTransport, Session, Transport, TransportError};
use crate::{SamsError, SamsResult};
use phenopacket::Phenopacket;
use std::path::Path;

/// Login state plus fetch operations over a [`Transport`].
#[derive(Debug)]
pub struct SessionManager<T = HttpTransport> {
    transport: T,
    session: Option<Session>,
}

impl SessionManager<HttpTransport> {
    /// Create a logged-out manager talking HTTP to the service described by `config`.
    pub fn connect(config: ClientConfig) -> SamsResult<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}

impl<T: Transport> SessionManager<T> {
    /// Create a logged-out manager over `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// True iff the last login succeeded and the session has not since been dropped.
    pub fn logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Log in with a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`SamsError::Authentication`] if either value is empty, the credentials are
    /// rejected, or the login request fails. The manager is logged out afterwards.
    pub fn login_with_username(&mut self, username: &str, password: &str) -> SamsResult<()> {
        self.session = None;
        let credentials = Credentials::new(username, password)?;
        self.login(&credentials)
    }

    /// Log in with credentials read from a file (line 1 username, line 2 password).
    ///
    /// # Errors
    ///
    /// Returns [`SamsError::Configuration`] if the file is missing or malformed, otherwise the
    /// errors of [`SessionManager::login_with_username`]. The manager is logged out afterwards.
    pub fn login_with_credentials_file(&mut self, path: impl AsRef<Path>) -> SamsResult<()> {
        self.session = None;
        let credentials = Credentials::from_file(path)?;
        self.login(&credentials)
    }

    /// Log in with already validated credentials.
    pub fn login(&mut self, credentials: &Credentials) -> SamsResult<()> {
        self.session = None;

        match self.transport.authenticate(credentials) {
            Ok(session) => {
                tracing::info!("logged in to SAMS as {}", credentials.username());
                self.session = Some(session);
                Ok(())
            }
            Err(TransportError::Rejected) => {
                tracing::warn!("SAMS rejected credentials for {}", credentials.username());
                Err(SamsError::Authentication(format!(
                    "credentials for {} rejected",
                    credentials.username()
                )))
            }
            Err(err) => {
                tracing::warn!("SAMS login failed: {}", err);
                Err(SamsError::Authentication(format!("login request failed: {err}")))
            }
        }
    }

    /// Drop the session. Later fetches fail with [`SamsError::NotAuthenticated`].
    pub fn logout(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("logged out of SAMS");
        }
    }

    /// Every phenopacket visible to the logged-in user, in the order SAMS returns them.
    ///
    /// # Errors
    ///
    /// - [`SamsError::NotAuthenticated`] before login or once the session has expired
    /// - [`SamsError::Transport`] on network or service failure
    /// - [`SamsError::MalformedDocument`] if a returned record does not parse
    pub fn get_phenopackets(&mut self) -> SamsResult<Vec<Phenopacket>> {
        let session = self.session.as_ref().ok_or(SamsError::NotAuthenticated)?;
        let result = self.transport.fetch_all(session);
        let phenopackets = self.settle(result)?;

        tracing::info!("fetched {} phenopackets", phenopackets.len());
        Ok(phenopackets)
    }

    /// The phenopacket of one patient, by SAMS external id.
    ///
    /// # Errors
    ///
    /// As [`SessionManager::get_phenopackets`], plus [`SamsError::NotFound`] when no patient
    /// has `patient_id`.
    pub fn get_phenopacket(&mut self, patient_id: &str) -> SamsResult<Phenopacket> {
        let session = self.session.as_ref().ok_or(SamsError::NotAuthenticated)?;
        let result = self.transport.fetch_one(session, patient_id);
        self.settle(result)
    }

    /// Map a transport result, logging out if the session has expired.
    fn settle<R>(&mut self, result: Result<R, TransportError>) -> SamsResult<R> {
        match result {
            Err(TransportError::SessionExpired) => {
                tracing::warn!("SAMS session expired");
                self.session = None;
                Err(SamsError::NotAuthenticated)
            }
            other => other.map_err(SamsError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::Write;

    /// Replays queued responses and records what was asked.
    #[derive(Default)]
    struct ScriptedTransport {
        logins: RefCell<VecDeque<Result<Session, TransportError>>>,
        fetches: RefCell<VecDeque<Result<Vec<Phenopacket>, TransportError>>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedTransport {
        fn accepting() -> Self {
            let transport = Self::default();
            transport.push_login(Ok(Session::new("token")));
            transport
        }

        fn push_login(&self, result: Result<Session, TransportError>) {
            self.logins.borrow_mut().push_back(result);
        }

        fn push_fetch(&self, result: Result<Vec<Phenopacket>, TransportError>) {
            self.fetches.borrow_mut().push_back(result);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn authenticate(&self, credentials: &Credentials) -> Result<Session, TransportError> {
            self.calls
                .borrow_mut()
                .push(format!("authenticate {}", credentials.username()));
            self.logins
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(TransportError::Rejected))
        }

        fn fetch_all(&self, _session: &Session) -> Result<Vec<Phenopacket>, TransportError> {
            self.calls.borrow_mut().push("fetch_all".into());
            self.fetches
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        fn fetch_one(
            &self,
            _session: &Session,
            patient_id: &str,
        ) -> Result<Phenopacket, TransportError> {
            self.calls.borrow_mut().push(format!("fetch_one {patient_id}"));
            let batch = self
                .fetches
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))?;
            batch
                .into_iter()
                .find(|p| p.subject_id() == Some(patient_id))
                .ok_or_else(|| TransportError::NotFound(patient_id.to_string()))
        }
    }

    fn patient(id: &str) -> Phenopacket {
        Phenopacket::from_value(json!({
            "subject": { "id": id },
            "phenotypicFeatures": [],
            "diseases": []
        }))
        .expect("valid phenopacket")
    }

    #[test]
    fn starts_logged_out() {
        let manager = SessionManager::new(ScriptedTransport::default());
        assert!(!manager.logged_in());
    }

    #[test]
    fn login_with_username_succeeds() {
        let mut manager = SessionManager::new(ScriptedTransport::accepting());
        manager.login_with_username("user", "pass").expect("login");
        assert!(manager.logged_in());
        assert_eq!(manager.transport().calls(), vec!["authenticate user"]);
    }

    #[test]
    fn rejected_login_is_authentication_error() {
        let mut manager = SessionManager::new(ScriptedTransport::default());
        let err = manager
            .login_with_username("user", "wrong")
            .expect_err("rejected");
        assert!(matches!(err, SamsError::Authentication(_)));
        assert!(!manager.logged_in());
    }

    #[test]
    fn transport_failure_during_login_is_authentication_error() {
        let transport = ScriptedTransport::default();
        transport.push_login(Err(TransportError::Connection("http://sams".into())));
        let mut manager = SessionManager::new(transport);

        let err = manager.login_with_username("user", "pass").expect_err("no network");
        match err {
            SamsError::Authentication(msg) => assert!(msg.contains("http://sams")),
            other => panic!("expected Authentication error, got {other:?}"),
        }
    }

    #[test]
    fn empty_credentials_never_reach_transport() {
        let mut manager = SessionManager::new(ScriptedTransport::accepting());
        assert!(manager.login_with_username("", "pass").is_err());
        assert!(manager.transport().calls().is_empty());
    }

    #[test]
    fn failed_login_drops_previous_session() {
        let transport = ScriptedTransport::accepting();
        transport.push_login(Err(TransportError::Rejected));
        let mut manager = SessionManager::new(transport);

        manager.login_with_username("user", "pass").expect("first login");
        assert!(manager.logged_in());
        assert!(manager.login_with_username("user", "wrong").is_err());
        assert!(!manager.logged_in());
    }

    #[test]
    fn login_with_credentials_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"user\npass\n").expect("write");

        let mut manager = SessionManager::new(ScriptedTransport::accepting());
        manager
            .login_with_credentials_file(file.path())
            .expect("login from file");
        assert!(manager.logged_in());
        assert_eq!(manager.transport().calls(), vec!["authenticate user"]);
    }

    #[test]
    fn malformed_credentials_file_is_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"only-a-username\n").expect("write");

        let mut manager = SessionManager::new(ScriptedTransport::accepting());
        let err = manager
            .login_with_credentials_file(file.path())
            .expect_err("malformed file");
        assert!(matches!(err, SamsError::Configuration(_)));
        assert!(manager.transport().calls().is_empty());
    }

    #[test]
    fn unreadable_credentials_file_drops_previous_session() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut manager = SessionManager::new(ScriptedTransport::accepting());
        manager.login_with_username("user", "pass").expect("first login");
        assert!(manager.logged_in());

        let err = manager
            .login_with_credentials_file(dir.path().join("creds.txt"))
            .expect_err("missing file");
        assert!(matches!(err, SamsError::Configuration(_)));
        assert!(!manager.logged_in());
        assert_eq!(manager.transport().calls(), vec!["authenticate user"]);
    }

    #[test]
    fn invalid_username_drops_previous_session() {
        let mut manager = SessionManager::new(ScriptedTransport::accepting());
        manager.login_with_username("user", "pass").expect("first login");

        assert!(manager.login_with_username("", "pass").is_err());
        assert!(!manager.logged_in());
    }

    #[test]
    fn fetch_before_login_is_not_authenticated() {
        let mut manager = SessionManager::new(ScriptedTransport::default());
        assert!(matches!(
            manager.get_phenopackets(),
            Err(SamsError::NotAuthenticated)
        ));
        assert!(matches!(
            manager.get_phenopacket("p1"),
            Err(SamsError::NotAuthenticated)
        ));
        assert!(manager.transport().calls().is_empty());
    }

    #[test]
    fn get_phenopackets_returns_transport_order() {
        let transport = ScriptedTransport::accepting();
        transport.push_fetch(Ok(vec![patient("b"), patient("a")]));
        let mut manager = SessionManager::new(transport);
        manager.login_with_username("user", "pass").expect("login");

        let phenopackets = manager.get_phenopackets().expect("fetch");
        let ids: Vec<_> = phenopackets.iter().map(Phenopacket::display_id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn get_phenopacket_finds_patient() {
        let transport = ScriptedTransport::accepting();
        transport.push_fetch(Ok(vec![patient("patient1")]));
        let mut manager = SessionManager::new(transport);
        manager.login_with_username("user", "pass").expect("login");

        let phenopacket = manager.get_phenopacket("patient1").expect("fetch");
        assert_eq!(phenopacket.subject_id(), Some("patient1"));
    }

    #[test]
    fn unknown_patient_is_not_found() {
        let transport = ScriptedTransport::accepting();
        transport.push_fetch(Ok(vec![patient("other")]));
        let mut manager = SessionManager::new(transport);
        manager.login_with_username("user", "pass").expect("login");

        let err = manager.get_phenopacket("patient1").expect_err("unknown id");
        assert!(matches!(err, SamsError::NotFound(id) if id == "patient1"));
        assert!(manager.logged_in());
    }

    #[test]
    fn expired_session_logs_out() {
        let transport = ScriptedTransport::accepting();
        transport.push_fetch(Err(TransportError::SessionExpired));
        let mut manager = SessionManager::new(transport);
        manager.login_with_username("user", "pass").expect("login");

        assert!(matches!(
            manager.get_phenopackets(),
            Err(SamsError::NotAuthenticated)
        ));
        assert!(!manager.logged_in());
        assert!(matches!(
            manager.get_phenopacket("p1"),
            Err(SamsError::NotAuthenticated)
        ));
        assert_eq!(
            manager.transport().calls(),
            vec!["authenticate user", "fetch_all"]
        );
    }

    #[test]
    fn transport_failure_surfaces_without_retry() {
        let transport = ScriptedTransport::accepting();
        transport.push_fetch(Err(TransportError::Status {
            status: 500,
            body: "boom".into(),
        }));
        let mut manager = SessionManager::new(transport);
        manager.login_with_username("user", "pass").expect("login");

        let err = manager.get_phenopackets().expect_err("server error");
        assert!(matches!(
            err,
            SamsError::Transport(TransportError::Status { status: 500, .. })
        ));
        assert!(manager.logged_in());
        assert_eq!(
            manager.transport().calls(),
            vec!["authenticate user", "fetch_all"]
        );
    }

    #[test]
    fn logout_drops_session() {
        let mut manager = SessionManager::new(ScriptedTransport::accepting());
        manager.login_with_username("user", "pass").expect("login");
        manager.logout();
        assert!(!manager.logged_in());
        assert!(matches!(
            manager.get_phenopackets(),
            Err(SamsError::NotAuthenticated)
        ));
    }
}
