use thiserror::Error;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const REQUIRED_GROUP: &str = "DSHBRD__SHIB_REQUIRED_GROUP";
pub const TEST_CLAIMS_JSON: &str = "DSHBRD__TEST_SHIB_JSON";
pub const LOG_JSON: &str = "DSHBRD__LOG_JSON";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Settings read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub required_group: Option<String>,
    pub test_claims_json: Option<String>,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            database_url: non_blank(DATABASE_URL),
            required_group: non_blank(REQUIRED_GROUP),
            test_claims_json: non_blank(TEST_CLAIMS_JSON),
            log_json: matches!(
                lookup(LOG_JSON).as_deref().map(str::trim),
                Some("1") | Some("true")
            ),
        }
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing(DATABASE_URL))
    }

    pub fn required_group(&self) -> Result<&str, ConfigError> {
        self.required_group
            .as_deref()
            .ok_or(ConfigError::Missing(REQUIRED_GROUP))
    }
}
