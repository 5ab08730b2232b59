//! Connection resolution
//!
//! Credentials precedence and the connector seam used to open an
//! authenticated administrative handle.

mod credentials;
mod resolver;

pub use credentials::{
    parse_client_section, AuthCredentials, CredentialsProvider, FileCredentials, NoCredentials,
    StaticCredentials, CREDENTIALS_FILE_NAME,
};
pub use resolver::{resolve_credentials, ConnectionResolver, Connector, CredentialSource};
