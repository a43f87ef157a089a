//! Failures raised while bringing up or talking to the runtime environment.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("media directory `{}` is not usable", path.display())]
    MediaRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not connect to the database")]
    Connect(#[source] sqlx::Error),
    #[error("database migrations failed")]
    Migrate(#[source] sqlx::Error),
    #[error("this command needs a database; set `database.url` or pass --database-url")]
    DatabaseRequired,
    #[error("tracing subscriber could not be installed: {0}")]
    Telemetry(String),
}
