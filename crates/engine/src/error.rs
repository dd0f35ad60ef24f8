use thiserror::Error;

use adgate_core::ValidationError;

use crate::store::StoreError;

/// Failure of an engine operation that crosses validation and storage,
/// such as recording spend or seeding a store.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
