pub mod auth;
pub mod error;
pub mod region;
pub mod request;
pub mod service;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use auth::{
    AuthType, Authenticator, BasicAuthenticator, BearerTokenAuthenticator, BoxedAuthenticator,
    IBM_IAM_URL, IamAuthenticator, NoAuthAuthenticator,
};
pub use error::{ServiceError, WatsonError, WatsonResult};
pub use region::IbmRegion;
pub use request::{RequestBody, RequestBuilder};
pub use service::{BaseService, DetailedResponse, ServiceOptions, shared};
pub use telemetry::Operation;
