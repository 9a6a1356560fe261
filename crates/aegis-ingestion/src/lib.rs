//! File upload and streamed-record ingestion for AegisShield: durable
//! uploads via object storage, per-record transaction-flow publishing,
//! and ingestion job lifecycle tracking.

pub mod error;
pub mod stream;
pub mod upload;

pub use error::{Error, Result};
pub use stream::{StreamIngestionPipeline, TransactionRecord};
pub use upload::UploadPipeline;
