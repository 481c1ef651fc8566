//! Rust client for IBM Watson cloud services.
//!
//! - [`speech_to_text`]: Speech to Text V1, including asynchronous
//!   recognition jobs and the callback handshake
//! - [`discovery`]: Discovery V1
//! - [`visual_recognition`]: Visual Recognition V3
//!
//! Every client is built from [`core::ServiceOptions`] or from
//! `<SERVICE>_*` environment variables through [`config::ServiceConfig`].

pub mod config;
pub mod core;
pub mod discovery;
pub mod speech_to_text;
pub mod utils;
pub mod visual_recognition;

pub use config::ServiceConfig;
pub use core::{DetailedResponse, ServiceError, ServiceOptions, WatsonError, WatsonResult};
pub use discovery::DiscoveryV1;
pub use speech_to_text::SpeechToTextV1;
pub use visual_recognition::VisualRecognitionV3;
