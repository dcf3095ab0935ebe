use std::{io, net::SocketAddr};

use clap::Parser;
use http::header::{HeaderValue, InvalidHeaderValue};
use thiserror::Error;

use crate::{
    handler::{CounterSync, DEFAULT_PATH},
    server::Server,
    DEFAULT_MAX_BODY_SIZE,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("endpoint path must start with '/': {0:?}")]
    InvalidPath(String),
    #[error("at least one worker thread is required")]
    NoThreads,
    #[error("invalid X-Powered-By value")]
    InvalidPoweredBy(#[from] InvalidHeaderValue),
}

/// Serve the counter sync endpoint.
#[derive(Parser, Debug, Clone)]
#[clap(name = "counter-echo", version)]
pub struct Config {
    /// Address to listen on.
    #[clap(long, env = "COUNTER_ECHO_LISTEN", default_value = "0.0.0.0:4444")]
    pub listen: SocketAddr,

    /// Number of worker threads handling connections.
    #[clap(long, env = "COUNTER_ECHO_MAX_THREADS", default_value_t = 512)]
    pub max_threads: usize,

    /// Path the endpoint is mounted on.
    #[clap(long, env = "COUNTER_ECHO_PATH", default_value = DEFAULT_PATH)]
    pub path: String,

    /// Largest request body accepted, in bytes.
    #[clap(long, env = "COUNTER_ECHO_MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: u64,

    /// Value of the X-Powered-By header sent with successful echoes.
    #[clap(long, env = "COUNTER_ECHO_POWERED_BY")]
    pub powered_by: Option<String>,
}

impl Config {
    pub fn app(&self) -> Result<CounterSync, ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.path.clone()));
        }

        let app = CounterSync::at(&self.path).max_body_size(self.max_body_size);

        match self.powered_by.as_deref() {
            Some(powered_by) => Ok(app.powered_by(HeaderValue::from_str(powered_by)?)),
            None => Ok(app),
        }
    }

    pub fn server(&self) -> io::Result<Server<'static>> {
        if self.max_threads == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                ConfigError::NoThreads,
            ));
        }

        Server::builder()
            .max_threads(self.max_threads)
            .max_body_size(self.max_body_size)
            .bind(self.listen)
    }
}
