//! MongoDB driver backend
//!
//! Thin adapter from [`ClusterAdmin`] to administrative commands on the
//! `admin` database, using the driver's synchronous API. Server error codes
//! are mapped onto [`ClusterError`] kinds here and nowhere else.
//!
//! Built only with the `driver` feature. Without it [`MongoConnector`]
//! still exists but reports the driver as unavailable, and [`capability`]
//! says so up front.

use std::time::Duration;

use crate::cluster::errors::{ClusterError, ClusterResult};
#[cfg(not(feature = "driver"))]
use crate::cluster::{model::ClusterEndpoint, ClusterAdmin};
#[cfg(not(feature = "driver"))]
use crate::connection::{AuthCredentials, Connector};

/// Startup capability check.
pub fn capability() -> ClusterResult<()> {
    if cfg!(feature = "driver") {
        Ok(())
    } else {
        Err(ClusterError::DriverUnavailable(
            "built without the `driver` feature".to_string(),
        ))
    }
}

/// Opens driver connections to a single node.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    connect_timeout: Duration,
    app_name: String,
}

impl MongoConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            app_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

#[cfg(not(feature = "driver"))]
impl Connector for MongoConnector {
    fn connect(
        &self,
        _endpoint: &ClusterEndpoint,
        _credentials: Option<&AuthCredentials>,
    ) -> ClusterResult<Box<dyn ClusterAdmin>> {
        capability()?;
        Err(ClusterError::DriverUnavailable(format!(
            "{} cannot open connections",
            self.app_name
        )))
    }
}

#[cfg(feature = "driver")]
pub use backend::MongoAdmin;

#[cfg(feature = "driver")]
mod backend {
    use bson::{doc, Document};
    use mongodb::error::{Error as DriverError, ErrorKind};
    use mongodb::options::{ClientOptions, Credential, ServerAddress, Tls, TlsOptions};
    use mongodb::sync::{Client, Database};
    use secrecy::ExposeSecret;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;

    use super::MongoConnector;
    use crate::cluster::admin::StatusProbe;
    use crate::cluster::errors::{ClusterError, ClusterResult};
    use crate::cluster::model::{
        ClusterEndpoint, ReplicaSetConfig, ReplicaSetStatus, ShardRegistryEntry,
    };
    use crate::cluster::ClusterAdmin;
    use crate::connection::{AuthCredentials, Connector};

    // Server error codes
    const UNAUTHORIZED: i32 = 13;
    const AUTHENTICATION_FAILED: i32 = 18;
    const NO_REPLICATION_ENABLED: i32 = 76;
    const NOT_YET_INITIALIZED: i32 = 94;
    const NEW_REPLICA_SET_CONFIGURATION_INCOMPATIBLE: i32 = 103;

    const ADMIN_DB: &str = "admin";

    #[derive(Deserialize)]
    struct ConfigResponse {
        config: ReplicaSetConfig,
    }

    #[derive(Deserialize)]
    struct ListShardsResponse {
        #[serde(default)]
        shards: Vec<ShardRegistryEntry>,
    }

    /// Administrative handle on the `admin` database of one node.
    pub struct MongoAdmin {
        admin: Database,
    }

    impl MongoAdmin {
        fn run(&self, name: &str, command: Document) -> ClusterResult<Document> {
            self.admin
                .run_command(command)
                .run()
                .map_err(|e| command_error(name, e))
        }

        fn decode<T: DeserializeOwned>(name: &str, response: Document) -> ClusterResult<T> {
            bson::from_document(response).map_err(|e| ClusterError::malformed(name, e.to_string()))
        }

        fn encode(name: &str, config: &ReplicaSetConfig) -> ClusterResult<Document> {
            bson::to_document(config).map_err(|e| ClusterError::malformed(name, e.to_string()))
        }
    }

    impl ClusterAdmin for MongoAdmin {
        fn replica_set_status(&self) -> StatusProbe {
            const NAME: &str = "replSetGetStatus";
            match self.admin.run_command(doc! { "replSetGetStatus": 1 }).run() {
                Ok(response) => match Self::decode::<ReplicaSetStatus>(NAME, response) {
                    Ok(status) => StatusProbe::Initialized(status),
                    Err(err) => StatusProbe::Unavailable(err),
                },
                Err(err) if server_code(&err) == Some(NOT_YET_INITIALIZED) => {
                    StatusProbe::NotInitialized
                }
                Err(err) if server_code(&err) == Some(NO_REPLICATION_ENABLED) => {
                    StatusProbe::Unavailable(ClusterError::command(
                        NAME,
                        format!("node is not running with replication enabled: {}", err),
                    ))
                }
                Err(err) => StatusProbe::Unavailable(command_error(NAME, err)),
            }
        }

        fn replica_set_config(&self) -> ClusterResult<ReplicaSetConfig> {
            const NAME: &str = "replSetGetConfig";
            match self.admin.run_command(doc! { "replSetGetConfig": 1 }).run() {
                Ok(response) => Self::decode::<ConfigResponse>(NAME, response).map(|r| r.config),
                Err(err) if server_code(&err) == Some(NOT_YET_INITIALIZED) => {
                    Err(ClusterError::NoReplicaSet)
                }
                Err(err) => Err(command_error(NAME, err)),
            }
        }

        fn initiate(&self, config: &ReplicaSetConfig) -> ClusterResult<()> {
            const NAME: &str = "replSetInitiate";
            let body = Self::encode(NAME, config)?;
            self.run(NAME, doc! { "replSetInitiate": body }).map(|_| ())
        }

        fn reconfigure(&self, config: &ReplicaSetConfig) -> ClusterResult<()> {
            const NAME: &str = "replSetReconfig";
            let body = Self::encode(NAME, config)?;
            match self.admin.run_command(doc! { "replSetReconfig": body }).run() {
                Ok(_) => Ok(()),
                Err(err) if server_code(&err) == Some(NEW_REPLICA_SET_CONFIGURATION_INCOMPATIBLE) => {
                    Err(ClusterError::VersionConflict {
                        submitted: config.version,
                        detail: err.to_string(),
                    })
                }
                Err(err) => Err(command_error(NAME, err)),
            }
        }

        fn list_shards(&self) -> ClusterResult<Vec<ShardRegistryEntry>> {
            const NAME: &str = "listShards";
            let response = self.run(NAME, doc! { "listShards": 1 })?;
            Self::decode::<ListShardsResponse>(NAME, response).map(|r| r.shards)
        }

        fn add_shard(&self, connection_string: &str) -> ClusterResult<()> {
            const NAME: &str = "addShard";
            self.run(NAME, doc! { "addShard": connection_string }).map(|_| ())
        }
    }

    impl Connector for MongoConnector {
        fn connect(
            &self,
            endpoint: &ClusterEndpoint,
            credentials: Option<&AuthCredentials>,
        ) -> ClusterResult<Box<dyn ClusterAdmin>> {
            let mut options = ClientOptions::default();
            options.hosts = vec![ServerAddress::Tcp {
                host: endpoint.host.clone(),
                port: Some(endpoint.port),
            }];
            options.direct_connection = Some(true);
            options.connect_timeout = Some(self.connect_timeout);
            options.server_selection_timeout = Some(self.connect_timeout);
            options.app_name = Some(self.app_name.clone());

            if endpoint.use_tls {
                options.tls = Some(Tls::Enabled(TlsOptions::default()));
            }

            if let Some(creds) = credentials {
                let mut credential = Credential::default();
                credential.username = Some(creds.user().to_string());
                credential.password = Some(creds.password().expose_secret().to_string());
                credential.source = Some(ADMIN_DB.to_string());
                options.credential = Some(credential);
            }

            let client = Client::with_options(options)
                .map_err(|e| ClusterError::Connection(e.to_string()))?;
            let admin = client.database(ADMIN_DB);

            // The driver authenticates lazily; force the handshake before
            // any reconciliation command is issued.
            admin
                .run_command(doc! { "ping": 1 })
                .run()
                .map_err(connect_error)?;

            Ok(Box::new(MongoAdmin { admin }))
        }
    }

    fn server_code(err: &DriverError) -> Option<i32> {
        match *err.kind {
            ErrorKind::Command(ref command) => Some(command.code),
            _ => None,
        }
    }

    fn connect_error(err: DriverError) -> ClusterError {
        match *err.kind {
            ErrorKind::Authentication { .. } => ClusterError::Auth(err.to_string()),
            ErrorKind::Command(ref command) if command.code == AUTHENTICATION_FAILED => {
                ClusterError::Auth(err.to_string())
            }
            _ => ClusterError::Connection(err.to_string()),
        }
    }

    fn command_error(name: &str, err: DriverError) -> ClusterError {
        match *err.kind {
            ErrorKind::Authentication { .. } => ClusterError::Auth(err.to_string()),
            ErrorKind::Command(ref command)
                if command.code == AUTHENTICATION_FAILED || command.code == UNAUTHORIZED =>
            {
                ClusterError::Auth(err.to_string())
            }
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
                ClusterError::Connection(err.to_string())
            }
            _ => ClusterError::command(name, err.to_string()),
        }
    }
}
