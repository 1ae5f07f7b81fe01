//! Resolved connections.

use std::fmt;

/// Default storage endpoint suffix.
pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// A plaintext secret. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The plaintext value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// How a client authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Full connection string (may embed a key).
    ConnectionString(Secret),
    /// Account key for the connection's account.
    AccessKey(Secret),
    /// The client's own identity (managed identity, CLI login, ...).
    AmbientIdentity,
}

/// Base credential shared by every object that uses the same secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    /// Account name, account endpoint or host, when known
    pub account_name: Option<String>,
    pub credential: Credential,
    /// Built from local development settings or a development storage string
    pub local_development: bool,
}

impl ResolvedConnection {
    pub fn connection_string(value: impl Into<String>) -> Self {
        let secret = Secret::new(value);
        let parsed = ConnectionString::parse(secret.expose());
        Self {
            account_name: parsed.account_name().map(str::to_string),
            local_development: parsed.is_development_storage(),
            credential: Credential::ConnectionString(secret),
        }
    }

    pub fn access_key(account_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            account_name: Some(account_name.into()),
            credential: Credential::AccessKey(Secret::new(key)),
            local_development: false,
        }
    }

    pub fn ambient(account_name: impl Into<String>) -> Self {
        Self {
            account_name: Some(account_name.into()),
            credential: Credential::AmbientIdentity,
            local_development: false,
        }
    }

    /// Emulator connection from a well-known connection string.
    pub fn local(connection_string: impl Into<String>) -> Self {
        Self {
            local_development: true,
            ..Self::connection_string(connection_string)
        }
    }

    /// The connection string, if this connection has one.
    pub fn connection_string_value(&self) -> Option<ConnectionString> {
        match &self.credential {
            Credential::ConnectionString(secret) => Some(ConnectionString::parse(secret.expose())),
            _ => None,
        }
    }
}

/// `key=value;` connection string with case-insensitive keys.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    /// Parse leniently; segments without `=` are skipped.
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split(';')
            .filter_map(|segment| {
                let (key, value) = segment.split_once('=')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { pairs }
    }

    /// Value for `key`, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_development_storage(&self) -> bool {
        self.get("UseDevelopmentStorage")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn account_name(&self) -> Option<&str> {
        self.get("AccountName")
    }

    pub fn endpoint_suffix(&self) -> &str {
        self.get("EndpointSuffix").unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
    }

    pub fn protocol(&self) -> &str {
        self.get("DefaultEndpointsProtocol").unwrap_or("https")
    }

    /// Same string with `key` set to `value`, replacing any existing entry.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
        self
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.pairs {
            write!(f, "{}={};", key, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.pairs.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ConnectionString").field("keys", &keys).finish()
    }
}
