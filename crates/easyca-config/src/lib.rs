//! Easyca Config
//!
//! This crate contains the serializable configuration types for easyca:
//!
//! - [`ProvisioningRequest`] describes one certificate-authority instance to
//!   provision, including distinguished-name fields and key parameters.
//! - [`ServiceConfig`] carries the service-wide settings (base directory,
//!   group ownership, easy-rsa version) shared by every instance.
//!
//! Requests are validated up front, before any filesystem side effect, so a
//! contradictory request never leaves partial state behind.

mod error;
mod request;
mod service;

pub use error::ConfigError;
pub use request::{DnMode, KeyAlgorithm, ProvisioningRequest, SubjectOverrides};
pub use service::ServiceConfig;
