//! Engine settings and their validation
//!
//! Settings arrive as loosely typed JSON (a settings file, or environment
//! variables holding JSON literals). Every option is checked on its own so
//! a malformed value is reported with the name of the offending option,
//! before any engine is built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_RESPONSE: &str = "default_response";
pub const SKIP_IMPLICIT: &str = "skip_implicit";
pub const LOG_ACCESS: &str = "log_access";
pub const LOG_PRIVILEGES: &str = "log_privileges";
pub const LOG_HIERARCHY: &str = "log_hierarchy";
pub const ROLES_LIST: &str = "roles_list";
pub const RESOURCES_LIST: &str = "resources_list";

/// All recognized option names
pub const OPTIONS: [&str; 7] = [
    DEFAULT_RESPONSE,
    SKIP_IMPLICIT,
    LOG_ACCESS,
    LOG_PRIVILEGES,
    LOG_HIERARCHY,
    ROLES_LIST,
    RESOURCES_LIST,
];

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "RBAC";

/// Configuration errors, one per malformed option
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Option has the wrong JSON shape
    #[error("{option}: expected {expected}, got {found}")]
    InvalidType {
        option: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Option has the right shape but an unsupported value
    #[error("{option}: unsupported value {value:?}, expected one of {allowed}")]
    InvalidValue {
        option: &'static str,
        value: String,
        allowed: &'static str,
    },

    /// List option contains a non-string entry
    #[error("{option}: entry {index} must be a type name string, got {found}")]
    InvalidListEntry {
        option: &'static str,
        index: usize,
        found: &'static str,
    },

    /// The settings document is not an object
    #[error("settings: expected an object, got {0}")]
    NotAnObject(&'static str),
}

/// Decision returned when no rule applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Allow the access
    Allow,
    /// Deny the access
    #[default]
    Deny,
}

impl Effect {
    /// Whether this effect grants access
    pub fn is_allow(self) -> bool {
        matches!(self, Effect::Allow)
    }
}

impl From<bool> for Effect {
    fn from(allowed: bool) -> Self {
        if allowed {
            Effect::Allow
        } else {
            Effect::Deny
        }
    }
}

/// Validated engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Decision when no rule applies at any distance
    pub default_response: Effect,

    /// Only consult rules attached to the principal itself
    pub skip_implicit: bool,

    /// Append an access record for every resolution
    pub log_access: bool,

    /// Emit a log event for every rule mutation
    pub log_privileges: bool,

    /// Record hierarchy edge changes
    pub log_hierarchy: bool,

    /// Recognized role types, unrestricted when `None`
    pub roles_list: Option<BTreeSet<String>>,

    /// Recognized resource types, unrestricted when `None`
    pub resources_list: Option<BTreeSet<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_response: Effect::Deny,
            skip_implicit: false,
            log_access: true,
            log_privileges: true,
            log_hierarchy: true,
            roles_list: None,
            resources_list: None,
        }
    }
}

impl Settings {
    pub fn with_default_response(mut self, effect: Effect) -> Self {
        self.default_response = effect;
        self
    }

    pub fn with_skip_implicit(mut self, skip: bool) -> Self {
        self.skip_implicit = skip;
        self
    }

    pub fn with_log_access(mut self, enabled: bool) -> Self {
        self.log_access = enabled;
        self
    }

    pub fn with_log_privileges(mut self, enabled: bool) -> Self {
        self.log_privileges = enabled;
        self
    }

    pub fn with_log_hierarchy(mut self, enabled: bool) -> Self {
        self.log_hierarchy = enabled;
        self
    }

    /// Restrict role types to `types`
    pub fn with_roles_list<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles_list = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict resource types to `types`
    pub fn with_resources_list<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources_list = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `role_type` is allowed by the roles list
    pub fn recognizes_role_type(&self, role_type: &str) -> bool {
        self.roles_list
            .as_ref()
            .map_or(true, |types| types.contains(role_type))
    }

    /// Whether `resource_type` is allowed by the resources list
    pub fn recognizes_resource_type(&self, resource_type: &str) -> bool {
        self.resources_list
            .as_ref()
            .map_or(true, |types| types.contains(resource_type))
    }

    /// Build settings from a JSON object, failing on the first malformed option
    ///
    /// Missing options keep their defaults. Unknown keys are ignored with a warning.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let options = as_object(value)?;
        let mut settings = Settings::default();

        for key in options.keys() {
            if !OPTIONS.contains(&key.as_str()) {
                warn!(option = %key, "Ignoring unknown settings option");
            }
        }

        if let Some(v) = options.get(DEFAULT_RESPONSE) {
            settings.default_response = check_default_response(v)?;
        }
        if let Some(v) = options.get(SKIP_IMPLICIT) {
            settings.skip_implicit = check_bool(SKIP_IMPLICIT, v)?;
        }
        if let Some(v) = options.get(LOG_ACCESS) {
            settings.log_access = check_bool(LOG_ACCESS, v)?;
        }
        if let Some(v) = options.get(LOG_PRIVILEGES) {
            settings.log_privileges = check_bool(LOG_PRIVILEGES, v)?;
        }
        if let Some(v) = options.get(LOG_HIERARCHY) {
            settings.log_hierarchy = check_bool(LOG_HIERARCHY, v)?;
        }
        if let Some(v) = options.get(ROLES_LIST) {
            settings.roles_list = check_type_list(ROLES_LIST, v)?;
        }
        if let Some(v) = options.get(RESOURCES_LIST) {
            settings.resources_list = check_type_list(RESOURCES_LIST, v)?;
        }

        Ok(settings)
    }

    /// Check every option of `value`, reporting all malformed ones
    pub fn validate(value: &Value) -> Vec<ConfigError> {
        let options = match as_object(value) {
            Ok(options) => options,
            Err(e) => return vec![e],
        };

        let mut errors = Vec::new();
        for (option, v) in options {
            let result = match option.as_str() {
                DEFAULT_RESPONSE => check_default_response(v).map(drop),
                SKIP_IMPLICIT => check_bool(SKIP_IMPLICIT, v).map(drop),
                LOG_ACCESS => check_bool(LOG_ACCESS, v).map(drop),
                LOG_PRIVILEGES => check_bool(LOG_PRIVILEGES, v).map(drop),
                LOG_HIERARCHY => check_bool(LOG_HIERARCHY, v).map(drop),
                ROLES_LIST => check_type_list(ROLES_LIST, v).map(drop),
                RESOURCES_LIST => check_type_list(RESOURCES_LIST, v).map(drop),
                _ => Ok(()),
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }
        errors
    }

    /// Load settings from `RBAC_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_prefixed(ENV_PREFIX)
    }

    /// Load settings from `<prefix>_<OPTION>` environment variables
    ///
    /// Values are parsed as JSON literals; anything that is not valid JSON
    /// is taken as a plain string (so `RBAC_DEFAULT_RESPONSE=allow` works).
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        let mut options = Map::new();
        for option in OPTIONS {
            let var = format!("{}_{}", prefix, option.to_uppercase());
            if let Ok(raw) = std::env::var(&var) {
                let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                options.insert(option.to_string(), value);
            }
        }
        Self::from_value(&Value::Object(options))
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| ConfigError::NotAnObject(json_kind(value)))
}

fn check_default_response(value: &Value) -> Result<Effect, ConfigError> {
    match value {
        Value::Bool(allowed) => Ok(Effect::from(*allowed)),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            _ => Err(ConfigError::InvalidValue {
                option: DEFAULT_RESPONSE,
                value: s.clone(),
                allowed: "\"allow\", \"deny\"",
            }),
        },
        other => Err(ConfigError::InvalidType {
            option: DEFAULT_RESPONSE,
            expected: "\"allow\", \"deny\" or a boolean",
            found: json_kind(other),
        }),
    }
}

fn check_bool(option: &'static str, value: &Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or(ConfigError::InvalidType {
        option,
        expected: "a boolean",
        found: json_kind(value),
    })
}

fn check_type_list(
    option: &'static str,
    value: &Value,
) -> Result<Option<BTreeSet<String>>, ConfigError> {
    let entries = match value {
        Value::Null => return Ok(None),
        Value::Array(entries) => entries,
        other => {
            return Err(ConfigError::InvalidType {
                option,
                expected: "a list of type names",
                found: json_kind(other),
            })
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or(ConfigError::InvalidListEntry {
                    option,
                    index,
                    found: json_kind(entry),
                })
        })
        .collect::<Result<BTreeSet<_>, _>>()
        .map(Some)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
