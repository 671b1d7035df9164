use std::env;

use rocket::data::{ByteUnit, ToByteUnit};

const DEFAULT_MAX_ROWS: usize = 5_000;
const DEFAULT_MAX_BODY_MIB: u64 = 16;

/// Limits applied to import requests.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub max_rows: usize,
    /// Largest JSON request body accepted, in bytes. Applied as Rocket's
    /// `limits.json` when the server is built.
    pub max_body_bytes: u64,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        let max_rows = env::var("CAMPUS_IMPORT_MAX_ROWS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_ROWS);

        let max_body_bytes = env::var("CAMPUS_IMPORT_MAX_BODY_BYTES")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or_else(default_max_body_bytes);

        Self {
            max_rows,
            max_body_bytes,
        }
    }

    pub fn body_limit(&self) -> ByteUnit {
        self.max_body_bytes.bytes()
    }
}

fn default_max_body_bytes() -> u64 {
    DEFAULT_MAX_BODY_MIB.mebibytes().as_u64()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_body_limit_is_well_above_rockets_json_default() {
        let config = ImportConfig::default();
        assert_eq!(config.max_rows, 5_000);
        assert_eq!(config.body_limit(), 16.mebibytes());
        assert!(config.body_limit() > rocket::data::Limits::JSON);
    }
}
