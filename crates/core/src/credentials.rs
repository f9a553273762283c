//! Login credentials.
//!
//! A credentials file is plain text: line 1 is the username, line 2 the password. Further lines
//! are ignored and surrounding whitespace is trimmed.

use crate::{SamsError, SamsResult};
use secrecy::SecretString;
use std::fs;
use std::path::Path;

/// A SAMS username and password.
///
/// The password is held as a [`SecretString`], so `Debug` output never shows it.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Validate a username/password pair. The username is trimmed; the password is kept as given.
    ///
    /// # Errors
    ///
    /// Returns [`SamsError::Authentication`] if either value is empty or whitespace.
    pub fn new(username: &str, password: &str) -> SamsResult<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(SamsError::Authentication("username cannot be empty".into()));
        }
        if password.trim().is_empty() {
            return Err(SamsError::Authentication("password cannot be empty".into()));
        }

        Ok(Self {
            username: username.to_owned(),
            password: SecretString::from(password.to_owned()),
        })
    }

    /// Read credentials from a file.
    ///
    /// # Errors
    ///
    /// Returns [`SamsError::Configuration`] if the file cannot be read or does not hold a
    /// non-empty username and password on its first two lines.
    pub fn from_file(path: impl AsRef<Path>) -> SamsResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            SamsError::Configuration(format!(
                "failed to read credentials file {}: {e}",
                path.display()
            ))
        })?;

        Self::parse(&contents).map_err(|reason| {
            SamsError::Configuration(format!(
                "malformed credentials file {}: {reason}",
                path.display()
            ))
        })
    }

    fn parse(contents: &str) -> Result<Self, &'static str> {
        let mut lines = contents.lines().map(str::trim);
        let username = lines.next().filter(|l| !l.is_empty());
        let password = lines.next().filter(|l| !l.is_empty());

        match (username, password) {
            (Some(username), Some(password)) => Ok(Self {
                username: username.to_owned(),
                password: SecretString::from(password.to_owned()),
            }),
            (None, _) => Err("expected a username on line 1"),
            (Some(_), None) => Err("expected a password on line 2"),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}
