use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Duplicate triple position given for bucket order.")]
pub struct BucketOrderCreationError;
