//! Environment variable loading.
//!
//! Variables are named `<PREFIX>_<FIELD>`, where the prefix is the service
//! name upper-cased with every non-alphanumeric character replaced by `_`
//! (`speech_to_text` → `SPEECH_TO_TEXT`).

use super::yaml::ServiceYaml;
use crate::core::error::{WatsonError, WatsonResult};

/// Environment variable prefix for `service_name`.
pub fn env_prefix(service_name: &str) -> String {
    service_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn var(prefix: &str, field: &str) -> Option<String> {
    std::env::var(format!("{prefix}_{field}"))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read every variable for `service_name` into the same shape the YAML file uses.
///
/// A `DISABLE_SSL` value that is not a recognized boolean is an error.
pub fn read_service_env(service_name: &str) -> WatsonResult<ServiceYaml> {
    let prefix = env_prefix(service_name);
    let disable_ssl = match var(&prefix, "DISABLE_SSL") {
        Some(raw) => Some(parse_bool(&raw).ok_or_else(|| {
            WatsonError::Configuration(format!("Invalid {prefix}_DISABLE_SSL value '{raw}'"))
        })?),
        None => None,
    };
    Ok(ServiceYaml {
        url: var(&prefix, "URL"),
        region: var(&prefix, "REGION"),
        auth_type: var(&prefix, "AUTH_TYPE").or_else(|| var(&prefix, "AUTHTYPE")),
        apikey: var(&prefix, "APIKEY").or_else(|| var(&prefix, "IAM_APIKEY")),
        iam_url: var(&prefix, "IAM_URL").or_else(|| var(&prefix, "AUTH_URL")),
        username: var(&prefix, "USERNAME"),
        password: var(&prefix, "PASSWORD"),
        bearer_token: var(&prefix, "BEARER_TOKEN"),
        disable_ssl,
    })
}
