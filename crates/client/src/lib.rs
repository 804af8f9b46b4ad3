//! HTTP side of the report builder: configuration, the backend client and
//! the async driver tying them to an [`engine::ReportSession`].

pub use backend::ReportBackend;
pub use builder::{BuilderResult, ReportBuilder};
pub use client::{Client, ClientError, ExportArtifact};
pub use self::config::{ClientConfig, load as load_config};
pub use error::{AppError, Result};

pub mod backend;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
