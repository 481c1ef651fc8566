//! Service configuration loading
//!
//! Credentials and endpoints come from a YAML file, environment variables
//! and `.env` files. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//!
//! # Example
//! ```rust,no_run
//! use watson_sdk::config::ServiceConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // SPEECH_TO_TEXT_APIKEY, SPEECH_TO_TEXT_URL, ...
//! let config = ServiceConfig::from_env("speech_to_text")?;
//!
//! // YAML file with environment variable fallbacks
//! let config = ServiceConfig::from_file(Path::new("watson.yaml"), "discovery")?;
//! println!("Discovery at {}", config.service_url("discovery"));
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use zeroize::Zeroizing;

use crate::core::auth::{
    AuthType, BasicAuthenticator, BearerTokenAuthenticator, BoxedAuthenticator, IamAuthenticator,
    NoAuthAuthenticator,
};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::region::IbmRegion;
use crate::core::service::ServiceOptions;

mod env;
mod yaml;

pub use env::env_prefix;
pub use yaml::{ServiceYaml, YamlConfig};

/// Resolved configuration of one service.
#[derive(Clone, Default)]
pub struct ServiceConfig {
    /// Service name used for lookups (`speech_to_text`, `discovery`, ...)
    pub service_name: String,
    /// Explicit service URL; wins over `region`
    pub url: Option<String>,
    pub region: Option<IbmRegion>,
    /// Explicit scheme; inferred from the credentials when absent
    pub auth_type: Option<AuthType>,
    pub apikey: Option<Zeroizing<String>>,
    pub iam_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub bearer_token: Option<Zeroizing<String>>,
    pub disable_ssl: bool,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<Zeroizing<String>>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ServiceConfig")
            .field("service_name", &self.service_name)
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

impl ServiceConfig {
    /// Load from environment variables (after loading `.env`, which never
    /// overrides variables already set).
    pub fn from_env(service_name: &str) -> WatsonResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_sources(service_name, None)
    }

    /// Load from a YAML file; environment variables fill the gaps.
    pub fn from_file(path: &Path, service_name: &str) -> WatsonResult<Self> {
        let _ = dotenvy::dotenv();
        let yaml = YamlConfig::from_file(path).map_err(WatsonError::Configuration)?;
        Self::from_sources(service_name, yaml.service(service_name))
    }

    /// Merge an optional YAML section over the environment.
    pub fn from_sources(service_name: &str, yaml: Option<&ServiceYaml>) -> WatsonResult<Self> {
        let env = env::read_service_env(service_name)?;
        let pick = |y: Option<&String>, e: &Option<String>| y.cloned().or_else(|| e.clone());
        let yaml = yaml.cloned().unwrap_or_default();

        let auth_type = match pick(yaml.auth_type.as_ref(), &env.auth_type) {
            Some(raw) => Some(AuthType::parse(&raw).ok_or_else(|| {
                WatsonError::Configuration(format!("Unsupported auth_type '{raw}'"))
            })?),
            None => None,
        };

        let region = match pick(yaml.region.as_ref(), &env.region) {
            Some(raw) => Some(IbmRegion::parse(&raw).ok_or_else(|| {
                WatsonError::Configuration(format!("Unknown region '{raw}'"))
            })?),
            None => None,
        };

        let config = Self {
            service_name: service_name.to_string(),
            url: pick(yaml.url.as_ref(), &env.url),
            region,
            auth_type,
            apikey: pick(yaml.apikey.as_ref(), &env.apikey).map(Zeroizing::new),
            iam_url: pick(yaml.iam_url.as_ref(), &env.iam_url),
            username: pick(yaml.username.as_ref(), &env.username),
            password: pick(yaml.password.as_ref(), &env.password).map(Zeroizing::new),
            bearer_token: pick(yaml.bearer_token.as_ref(), &env.bearer_token).map(Zeroizing::new),
            disable_ssl: yaml.disable_ssl.or(env.disable_ssl).unwrap_or(false),
        };

        debug!(
            service = service_name,
            auth_type = config.effective_auth_type().map(|a| a.as_str()).unwrap_or("none"),
            "Loaded service configuration"
        );

        Ok(config)
    }

    /// Explicit auth type, or the one implied by the credentials present.
    ///
    /// A username of `apikey` with a password is treated as IAM with the
    /// password as the API key, the way IBM Cloud service credentials are
    /// often copied.
    pub fn effective_auth_type(&self) -> Option<AuthType> {
        if self.auth_type.is_some() {
            return self.auth_type;
        }
        if self.apikey.is_some() || self.username.as_deref() == Some("apikey") {
            Some(AuthType::Iam)
        } else if self.bearer_token.is_some() {
            Some(AuthType::BearerToken)
        } else if self.username.is_some() && self.password.is_some() {
            Some(AuthType::Basic)
        } else {
            None
        }
    }

    /// Build the authenticator described by this configuration.
    pub fn authenticator(&self) -> WatsonResult<BoxedAuthenticator> {
        let auth_type = self.effective_auth_type().ok_or_else(|| {
            WatsonError::Configuration(format!(
                "No credentials found for service '{}'; set {}_APIKEY or {}_AUTH_TYPE",
                self.service_name,
                env_prefix(&self.service_name),
                env_prefix(&self.service_name)
            ))
        })?;

        let authenticator: BoxedAuthenticator = match auth_type {
            AuthType::Iam => {
                let apikey = self
                    .apikey
                    .as_ref()
                    .or(match self.username.as_deref() {
                        Some("apikey") => self.password.as_ref(),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        WatsonError::Configuration("apikey is required for IAM".to_string())
                    })?;
                let mut iam = IamAuthenticator::new(apikey.as_str())?;
                if let Some(url) = &self.iam_url {
                    iam = iam.with_url(url.as_str());
                }
                Arc::new(iam)
            }
            AuthType::Basic => {
                let username = self.username.as_deref().unwrap_or_default();
                let password = self.password.as_ref().map(|p| p.as_str()).unwrap_or_default();
                Arc::new(BasicAuthenticator::new(username, password)?)
            }
            AuthType::BearerToken => {
                let token = self
                    .bearer_token
                    .as_ref()
                    .map(|t| t.as_str())
                    .unwrap_or_default();
                Arc::new(BearerTokenAuthenticator::new(token)?)
            }
            AuthType::NoAuth => Arc::new(NoAuthAuthenticator),
        };
        Ok(authenticator)
    }

    /// Service URL: the explicit URL, else the regional default for
    /// `service_host` (for example `speech-to-text`).
    pub fn service_url(&self, service_host: &str) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| self.region.unwrap_or_default().service_url(service_host))
    }

    /// Everything needed to construct a service client.
    pub fn service_options(&self, service_host: &str) -> WatsonResult<ServiceOptions> {
        Ok(ServiceOptions::new(self.service_url(service_host), self.authenticator()?)
            .with_disable_ssl_verification(self.disable_ssl))
    }
}
