//! Connection Resolver
//!
//! Turns an endpoint plus whatever credentials were supplied into an
//! authenticated [`ClusterAdmin`] handle.
//!
//! Credential precedence:
//! 1. explicit user and password
//! 2. the credentials provider, when neither was given
//! 3. unauthenticated
//!
//! Exactly one explicit value is an input error. When credentials resolve,
//! the connector authenticates before returning, so an auth failure stops
//! the invocation before any reconciliation command.

use secrecy::SecretString;

use super::credentials::{AuthCredentials, CredentialsProvider};
use crate::cluster::{ClusterAdmin, ClusterEndpoint, ClusterError, ClusterResult};
use crate::observability::{Event, Logger};

/// Opens a handle to one node.
pub trait Connector {
    fn connect(
        &self,
        endpoint: &ClusterEndpoint,
        credentials: Option<&AuthCredentials>,
    ) -> ClusterResult<Box<dyn ClusterAdmin>>;
}

/// Where the credentials in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Stored,
    Anonymous,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Explicit => "explicit",
            CredentialSource::Stored => "stored",
            CredentialSource::Anonymous => "anonymous",
        }
    }
}

/// Apply the precedence rules.
pub fn resolve_credentials(
    user: Option<String>,
    password: Option<SecretString>,
    provider: &dyn CredentialsProvider,
) -> ClusterResult<(Option<AuthCredentials>, CredentialSource)> {
    match (user, password) {
        (Some(user), Some(password)) => Ok((
            Some(AuthCredentials::new(user, password)),
            CredentialSource::Explicit,
        )),
        (None, None) => match provider.stored_credentials() {
            Some(creds) => Ok((Some(creds), CredentialSource::Stored)),
            None => Ok((None, CredentialSource::Anonymous)),
        },
        _ => Err(ClusterError::IncompleteCredentials),
    }
}

/// Resolves authenticated admin handles.
pub struct ConnectionResolver<'a> {
    connector: &'a dyn Connector,
    provider: &'a dyn CredentialsProvider,
}

impl<'a> ConnectionResolver<'a> {
    pub fn new(connector: &'a dyn Connector, provider: &'a dyn CredentialsProvider) -> Self {
        Self {
            connector,
            provider,
        }
    }

    /// Resolve credentials, connect and authenticate.
    pub fn resolve(
        &self,
        endpoint: &ClusterEndpoint,
        user: Option<String>,
        password: Option<SecretString>,
    ) -> ClusterResult<Box<dyn ClusterAdmin>> {
        let (credentials, source) = resolve_credentials(user, password, self.provider)?;

        Logger::info(
            Event::CredentialsResolved.as_str(),
            &[
                ("source", source.as_str()),
                ("provider", self.provider.source()),
            ],
        );

        let endpoint_str = endpoint.to_string();
        match self.connector.connect(endpoint, credentials.as_ref()) {
            Ok(handle) => {
                Logger::info(
                    Event::ConnectionEstablished.as_str(),
                    &[
                        ("endpoint", endpoint_str.as_str()),
                        ("tls", if endpoint.use_tls { "true" } else { "false" }),
                        ("authenticated", if credentials.is_some() { "true" } else { "false" }),
                    ],
                );
                Ok(handle)
            }
            Err(err) => {
                let event = match err {
                    ClusterError::Auth(_) => Event::AuthenticationRejected,
                    _ => Event::ConnectionFailed,
                };
                let reason = err.to_string();
                Logger::error(
                    event.as_str(),
                    &[("endpoint", endpoint_str.as_str()), ("reason", reason.as_str())],
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{NoCredentials, StaticCredentials};
    use secrecy::ExposeSecret;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_explicit_wins_over_stored() {
        let provider = StaticCredentials::new("stored", "stored-pw");
        let (creds, source) =
            resolve_credentials(Some("explicit".into()), Some(secret("pw")), &provider).unwrap();

        let creds = creds.unwrap();
        assert_eq!(creds.user(), "explicit");
        assert_eq!(creds.password().expose_secret(), "pw");
        assert_eq!(source, CredentialSource::Explicit);
    }

    #[test]
    fn test_stored_used_when_none_given() {
        let provider = StaticCredentials::new("stored", "stored-pw");
        let (creds, source) = resolve_credentials(None, None, &provider).unwrap();

        assert_eq!(creds.unwrap().user(), "stored");
        assert_eq!(source, CredentialSource::Stored);
    }

    #[test]
    fn test_anonymous_without_stored() {
        let (creds, source) = resolve_credentials(None, None, &NoCredentials).unwrap();
        assert!(creds.is_none());
        assert_eq!(source, CredentialSource::Anonymous);
    }

    #[test]
    fn test_half_supplied_is_input_error() {
        let provider = StaticCredentials::new("stored", "stored-pw");

        let err = resolve_credentials(Some("u".into()), None, &provider).unwrap_err();
        assert_eq!(err, ClusterError::IncompleteCredentials);

        let err = resolve_credentials(None, Some(secret("pw")), &provider).unwrap_err();
        assert_eq!(err, ClusterError::IncompleteCredentials);
    }
}
