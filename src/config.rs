//! We can have a little hard-coded config, [as a
//! snack](https://knowyourmeme.com/memes/cats-can-have-a-little-salami).
//! Everything that differs between deployments comes from the environment.

use anyhow::{bail, Context, Result};
use std::{env, net::SocketAddr, time::Duration};

pub const SESSION_COOKIE: &str = "session";

/// One week.
pub const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// Upper bound on any single round trip to the notes service.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Collapsed note cards show this many characters of content.
pub const PREVIEW_CHARS: usize = 150;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Talk to the remote notes API.
    Http,
    /// Keep everything in process; handy for local development.
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub backend: Backend,
    pub session_secret: Vec<u8>,
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = match lookup("NOTES_BACKEND").as_deref() {
            None | Some("http") => Backend::Http,
            Some("memory") => Backend::Memory,
            Some(other) => bail!("unknown NOTES_BACKEND {other:?}"),
        };
        let session_secret = lookup("SESSION_SECRET")
            .filter(|s| !s.is_empty())
            .context("SESSION_SECRET must be defined in the environment")?
            .into_bytes();
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .context("LISTEN_ADDR must be a socket address")?;

        Ok(Self {
            api_url: lookup("NOTES_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            backend,
            session_secret,
            listen_addr,
        })
    }
}
