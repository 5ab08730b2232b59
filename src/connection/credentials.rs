//! Credential sources
//!
//! Stored credentials come from a [`CredentialsProvider`]. The default one
//! reads `~/.mongodb.cnf`:
//!
//! ```text
//! [client]
//! user = admin
//! pass = s3cret
//! ```
//!
//! A missing, unreadable or incomplete file means "no stored credentials".
//! It is never an error.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

/// Default credentials file name, relative to the home directory.
pub const CREDENTIALS_FILE_NAME: &str = ".mongodb.cnf";

const CLIENT_SECTION: &str = "client";

/// A user/password pair. The password never shows up in `Debug` output.
pub struct AuthCredentials {
    user: String,
    password: SecretString,
}

impl AuthCredentials {
    pub fn new(user: impl Into<String>, password: SecretString) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Source of stored credentials, consulted only when none were given
/// explicitly.
pub trait CredentialsProvider {
    /// Short name for logs.
    fn source(&self) -> &str;

    fn stored_credentials(&self) -> Option<AuthCredentials>;
}

/// INI file with a `[client]` section holding `user` and `pass`.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.mongodb.cnf`, or `None` when no home directory is known.
    pub fn default_location() -> Option<Self> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| Self::new(Path::new(&home).join(CREDENTIALS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialsProvider for FileCredentials {
    fn source(&self) -> &str {
        "file"
    }

    fn stored_credentials(&self) -> Option<AuthCredentials> {
        let content = fs::read_to_string(&self.path).ok()?;
        parse_client_section(&content)
    }
}

/// Never any stored credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialsProvider for NoCredentials {
    fn source(&self) -> &str {
        "none"
    }

    fn stored_credentials(&self) -> Option<AuthCredentials> {
        None
    }
}

/// Fixed stored credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    user: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn source(&self) -> &str {
        "static"
    }

    fn stored_credentials(&self) -> Option<AuthCredentials> {
        Some(AuthCredentials::new(
            self.user.clone(),
            SecretString::from(self.password.clone()),
        ))
    }
}

/// Extract `user` and `pass` from the `[client]` section.
///
/// Both keys must be present. Lines outside any section, comments (`#`,
/// `;`) and other sections are ignored. Keys are case-insensitive; the last
/// occurrence wins.
pub fn parse_client_section(content: &str) -> Option<AuthCredentials> {
    let mut in_client = false;
    let mut user = None;
    let mut pass = None;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[') {
            let name = section.strip_suffix(']')?.trim();
            in_client = name == CLIENT_SECTION;
            continue;
        }

        if !in_client {
            continue;
        }

        let (key, value) = line.split_once(['=', ':'])?;
        let value = value.trim().to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "user" => user = Some(value),
            "pass" => pass = Some(value),
            _ => {}
        }
    }

    Some(AuthCredentials::new(user?, SecretString::from(pass?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_parse_client_section() {
        let creds = parse_client_section("[client]\nuser = admin\npass = s3cret\n").unwrap();
        assert_eq!(creds.user(), "admin");
        assert_eq!(creds.password().expose_secret(), "s3cret");
    }

    #[test]
    fn test_parse_ignores_other_sections_and_comments() {
        let content = "\
# stored by ops
[mysql]
user = wrong
pass = wrong

[client]
; comment
user: admin
pass: s3cret
";
        let creds = parse_client_section(content).unwrap();
        assert_eq!(creds.user(), "admin");
        assert_eq!(creds.password().expose_secret(), "s3cret");
    }

    #[test]
    fn test_parse_missing_pass() {
        assert!(parse_client_section("[client]\nuser = admin\n").is_none());
    }

    #[test]
    fn test_parse_missing_section() {
        assert!(parse_client_section("user = admin\npass = x\n").is_none());
    }

    #[test]
    fn test_parse_malformed_line() {
        assert!(parse_client_section("[client]\nuser admin\npass = x\n").is_none());
        assert!(parse_client_section("[client\nuser = admin\npass = x\n").is_none());
    }

    #[test]
    fn test_file_credentials_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let provider = FileCredentials::new(dir.path().join("absent.cnf"));
        assert!(provider.stored_credentials().is_none());
    }

    #[test]
    fn test_file_credentials_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nuser = ops\npass = hunter2").unwrap();

        let provider = FileCredentials::new(file.path());
        let creds = provider.stored_credentials().unwrap();
        assert_eq!(creds.user(), "ops");
        assert_eq!(creds.password().expose_secret(), "hunter2");
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = AuthCredentials::new("ops", SecretString::from("hunter2".to_string()));
        let shown = format!("{:?}", creds);
        assert!(shown.contains("ops"));
        assert!(!shown.contains("hunter2"));
    }
}
