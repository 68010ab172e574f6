//! Command Client
//!
//! Typed operations over one [`Connection`]. Every call is
//! encode → send and wait → decode, and every call requires the connection
//! to be Open. None of them change the connection state themselves, apart
//! from a fatal socket error closing it.

use std::collections::HashMap;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::network::{Connection, ConnectionState};
use crate::protocol::{self, Command, Reply};

/// Key/value pairs exchanged with table-oriented callers
pub type KeyValueMap = HashMap<String, String>;

/// Blocking client for one store
#[derive(Debug)]
pub struct Client {
    connection: Connection,
}

impl Client {
    /// Connect using `config`
    ///
    /// With `blocking_connect` disabled the returned client is still Opening;
    /// wait on [`Connection::wait_open`] before issuing commands.
    pub fn connect(config: Config) -> Result<Self> {
        let connection = Connection::with_config(&config)?;
        Ok(Self { connection })
    }

    /// Blocking connect to `host:port` with default settings
    pub fn connect_addr(host: &str, port: u16) -> Result<Self> {
        Self::connect(Config::builder().host(host).port(port).build())
    }

    /// Wrap an existing connection
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    fn round_trip(&self, command: &Command) -> Result<Bytes> {
        tracing::debug!(command = command.name(), "Sending command");
        self.connection.send(&command.encode())
    }

    /// Send any supported command and return the reply in tagged form
    pub fn execute(&self, command: &Command) -> Result<Reply> {
        let raw = self.round_trip(command)?;
        protocol::decode_reply(&raw)
    }

    /// Returns true when the store answers `PONG`
    pub fn ping(&self) -> Result<bool> {
        let raw = self.round_trip(&Command::Ping)?;
        let status = protocol::decode_status(&raw)?;
        Ok(status == "PONG")
    }

    /// Fetches a value by key.
    ///
    /// Returns `Ok(None)` when the key is missing.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let raw = self.round_trip(&Command::Get {
            key: key.as_ref().to_vec(),
        })?;
        protocol::decode_bulk(&raw)
    }

    /// Sets a value. Returns true when the store acknowledges with `OK`.
    pub fn set(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<bool> {
        let raw = self.round_trip(&Command::Set {
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        })?;
        let status = protocol::decode_status(&raw)?;
        Ok(status == "OK")
    }

    /// Fetches several values in one request.
    ///
    /// The result is aligned with `keys`: one entry per key, `None` where the
    /// key is missing.
    pub fn mget<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let raw = self.round_trip(&Command::MGet {
            keys: keys.iter().map(|k| k.as_ref().to_vec()).collect(),
        })?;
        let values = protocol::decode_multi_bulk(&raw)?;
        if values.len() != keys.len() {
            return Err(KvError::Protocol(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }
        Ok(values)
    }

    /// Stores every pair of `map` in one request
    pub fn mset(&self, map: &KeyValueMap) -> Result<bool> {
        let pairs: Vec<(&str, &str)> = map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        self.mset_pairs(pairs.as_slice())
    }

    /// Stores key/value pairs in one request, sent in the given order
    pub fn mset_pairs<K: AsRef<[u8]>, V: AsRef<[u8]>>(&self, pairs: &[(K, V)]) -> Result<bool> {
        if pairs.is_empty() {
            return Ok(true);
        }

        let raw = self.round_trip(&Command::MSet {
            pairs: pairs
                .iter()
                .map(|(k, v)| (k.as_ref().to_vec(), v.as_ref().to_vec()))
                .collect(),
        })?;
        let status = protocol::decode_status(&raw)?;
        Ok(status == "OK")
    }

    /// Lists keys matching `pattern`, in the order the store returns them
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let names = self
            .raw_keys(pattern)?
            .into_iter()
            .map(|name| String::from_utf8_lossy(&name).into_owned())
            .collect();
        Ok(names)
    }

    fn raw_keys(&self, pattern: &str) -> Result<Vec<Vec<u8>>> {
        let raw = self.round_trip(&Command::Keys {
            pattern: pattern.as_bytes().to_vec(),
        })?;
        Ok(protocol::decode_multi_bulk(&raw)?.into_iter().flatten().collect())
    }

    /// Fetches the store's diagnostic text
    pub fn info(&self) -> Result<String> {
        let raw = self.round_trip(&Command::Info)?;
        let payload = protocol::decode_bulk(&raw)?.unwrap_or_default();
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    /// Loads every key matching `pattern` together with its value
    ///
    /// Keys that disappear between the listing and the fetch are left out.
    /// Values are fetched by the exact key bytes the store listed; only the
    /// map's keys are converted to text.
    pub fn map_keys(&self, pattern: &str) -> Result<KeyValueMap> {
        let keys = self.raw_keys(pattern)?;
        if keys.is_empty() {
            return Ok(KeyValueMap::new());
        }

        let values = self.mget(keys.as_slice())?;
        let map: KeyValueMap = keys
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| {
                let value = value?;
                Some((
                    String::from_utf8_lossy(&key).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                ))
            })
            .collect();
        tracing::debug!(pattern, entries = map.len(), "Loaded key map");
        Ok(map)
    }
}
