use thiserror::Error;

pub(crate) mod aggregator;
pub(crate) mod handler;
pub(crate) mod metrics;
pub(crate) mod records;
pub(crate) mod registry;
pub(crate) mod timestream;

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum WriteError {
    /// Some records were refused. The rest of the batch may already be stored.
    #[error("{} record(s) rejected by {sink}", .rejected.len())]
    RejectedRecords {
        sink: &'static str,
        rejected: Vec<Rejection>,
    },
    #[error("{sink} write failed: {message}")]
    Service { sink: &'static str, message: String },
    #[error("Invalid {sink} record: {message}")]
    Build { sink: &'static str, message: String },
}
