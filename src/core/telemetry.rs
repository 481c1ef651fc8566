//! SDK analytics headers attached to every request.
//!
//! These identify the library, its version, the platform and the operation
//! that produced the request. They carry no functional meaning for the
//! services.

use once_cell::sync::Lazy;

/// Name reported in the `User-Agent` header.
pub const SDK_NAME: &str = "watson-apis-rust-sdk";

/// Library version reported in the `User-Agent` header.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Analytics header name.
pub const ANALYTICS_HEADER: &str = "X-IBMCloud-SDK-Analytics";

static USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "{SDK_NAME}-{SDK_VERSION} {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});

/// Value of the `User-Agent` header, e.g. `watson-apis-rust-sdk-1.0.0 linux x86_64`.
pub fn user_agent() -> &'static str {
    &USER_AGENT
}

/// Identifies the operation a request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub service_name: &'static str,
    pub service_version: &'static str,
    pub operation_id: &'static str,
}

impl Operation {
    pub const fn new(
        service_name: &'static str,
        service_version: &'static str,
        operation_id: &'static str,
    ) -> Self {
        Self {
            service_name,
            service_version,
            operation_id,
        }
    }

    /// Value of the analytics header for this operation.
    pub fn analytics_header(&self) -> String {
        format!(
            "service_name={};service_version={};operation_id={}",
            self.service_name, self.service_version, self.operation_id
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.service_name, self.operation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analytics_header_format() {
        let op = Operation::new("speech_to_text", "V1", "Recognize");
        assert_eq!(
            op.analytics_header(),
            "service_name=speech_to_text;service_version=V1;operation_id=Recognize"
        );
        assert_eq!(op.to_string(), "speech_to_text.Recognize");
    }

    #[test]
    fn test_user_agent_names_sdk_and_platform() {
        let ua = user_agent();
        assert!(ua.starts_with("watson-apis-rust-sdk-"));
        assert!(ua.contains(SDK_VERSION));
        assert!(ua.contains(std::env::consts::OS));
    }
}
