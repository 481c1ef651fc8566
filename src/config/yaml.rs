use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Complete YAML configuration structure
///
/// Credentials for any number of services, keyed by service name. Every
/// field is optional; environment variables fill whatever the file leaves
/// out.
///
/// # Example YAML structure
/// ```yaml
/// services:
///   speech_to_text:
///     url: "https://api.eu-de.speech-to-text.watson.cloud.ibm.com/instances/1234"
///     auth_type: "iam"
///     apikey: "your-api-key"
///
///   discovery:
///     region: "us-south"
///     auth_type: "basic"
///     username: "user"
///     password: "secret"
///
///   visual_recognition:
///     auth_type: "bearerToken"
///     bearer_token: "eyJ..."
///     disable_ssl: true
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub services: HashMap<String, ServiceYaml>,
}

/// Credentials and endpoint of one service
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceYaml {
    pub url: Option<String>,
    pub region: Option<String>,
    pub auth_type: Option<String>,
    pub apikey: Option<String>,
    /// IAM server (bare host or full token endpoint)
    pub iam_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bearer_token: Option<String>,
    pub disable_ssl: Option<bool>,
}

impl std::fmt::Debug for ServiceYaml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ServiceYaml")
            .field("url", &self.url)
            .field("region", &self.region)
            .field("auth_type", &self.auth_type)
            .field("apikey", &redact(&self.apikey))
            .field("iam_url", &self.iam_url)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("bearer_token", &redact(&self.bearer_token))
            .field("disable_ssl", &self.disable_ssl)
            .finish()
    }
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        Self::parse(&contents)
    }

    /// Parse configuration from YAML text
    pub fn parse(contents: &str) -> Result<Self, String> {
        serde_yaml::from_str(contents).map_err(|e| format!("Failed to parse YAML config: {e}"))
    }

    /// Section for `service_name`, if present.
    pub fn service(&self, service_name: &str) -> Option<&ServiceYaml> {
        self.services.get(service_name)
    }
}
