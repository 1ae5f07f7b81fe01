// Environment variable loading

use serde_json::Value;
use std::env;

/// Separator that nests environment variable names into sections
/// (`TENSTORE_LOCAL__SQL_CONNECTION_STRING` -> `local.sql_connection_string`).
pub const SECTION_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Collect the process environment as `(dotted.path, value)` pairs
    pub fn load(&self) -> Vec<(String, Value)> {
        self.collect(env::vars())
    }

    /// Collect the given variables as `(dotted.path, value)` pairs.
    ///
    /// Variables outside the prefix are skipped. Values that look like
    /// booleans or integers are typed accordingly.
    pub fn collect<I>(&self, vars: I) -> Vec<(String, Value)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let name = match &self.prefix {
                    Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
                    None => key.as_str(),
                };
                if name.is_empty() {
                    return None;
                }
                let path = name.to_lowercase().replace(SECTION_SEPARATOR, ".");
                Some((path, infer_scalar(&value)))
            })
            .collect()
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Type an environment string as bool, integer or string.
pub fn infer_scalar(raw: &str) -> Value {
    match raw.trim() {
        "true" | "TRUE" | "True" => Value::Bool(true),
        "false" | "FALSE" | "False" => Value::Bool(false),
        trimmed => match trimmed.parse::<i64>() {
            Ok(number) => Value::from(number),
            Err(_) => Value::String(raw.to_string()),
        },
    }
}
