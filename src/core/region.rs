//! IBM Cloud regions and the per-service hostnames served in each.

use serde::{Deserialize, Serialize};

/// IBM Cloud regions hosting Watson services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IbmRegion {
    /// Dallas, Texas (US South)
    #[default]
    UsSouth,
    /// Washington, D.C. (US East)
    UsEast,
    /// Frankfurt, Germany (EU Central)
    EuDe,
    /// London, UK (EU GB)
    EuGb,
    /// Sydney, Australia (AU SYD)
    AuSyd,
    /// Tokyo, Japan (JP TOK)
    JpTok,
    /// Seoul, South Korea (KR SEO)
    KrSeo,
}

impl IbmRegion {
    /// All known regions.
    pub const ALL: [IbmRegion; 7] = [
        Self::UsSouth,
        Self::UsEast,
        Self::EuDe,
        Self::EuGb,
        Self::AuSyd,
        Self::JpTok,
        Self::KrSeo,
    ];

    /// Get the region code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsSouth => "us-south",
            Self::UsEast => "us-east",
            Self::EuDe => "eu-de",
            Self::EuGb => "eu-gb",
            Self::AuSyd => "au-syd",
            Self::JpTok => "jp-tok",
            Self::KrSeo => "kr-seo",
        }
    }

    /// Parse a region code, accepting either `us-south` or `us_south`.
    pub fn parse(code: &str) -> Option<Self> {
        let normalized = code.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|r| r.as_str() == normalized)
    }

    /// Hostname of `service` (for example `speech-to-text`) in this region.
    pub fn hostname(&self, service: &str) -> String {
        format!("api.{}.{}.watson.cloud.ibm.com", self.as_str(), service)
    }

    /// HTTPS base URL of `service` in this region.
    pub fn service_url(&self, service: &str) -> String {
        format!("https://{}", self.hostname(service))
    }
}

impl std::fmt::Display for IbmRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_hostnames() {
        assert_eq!(
            IbmRegion::UsSouth.hostname("speech-to-text"),
            "api.us-south.speech-to-text.watson.cloud.ibm.com"
        );
        assert_eq!(
            IbmRegion::EuDe.service_url("discovery"),
            "https://api.eu-de.discovery.watson.cloud.ibm.com"
        );
        assert_eq!(
            IbmRegion::JpTok.hostname("visual-recognition"),
            "api.jp-tok.visual-recognition.watson.cloud.ibm.com"
        );
    }

    #[test]
    fn test_region_parse() {
        assert_eq!(IbmRegion::parse("eu-gb"), Some(IbmRegion::EuGb));
        assert_eq!(IbmRegion::parse("KR_SEO"), Some(IbmRegion::KrSeo));
        assert_eq!(IbmRegion::parse("mars-north"), None);
    }

    #[test]
    fn test_region_serde_kebab_case() {
        let json = serde_json::to_string(&IbmRegion::AuSyd).unwrap();
        assert_eq!(json, "\"au-syd\"");
        let parsed: IbmRegion = serde_json::from_str("\"us-east\"").unwrap();
        assert_eq!(parsed, IbmRegion::UsEast);
    }
}
