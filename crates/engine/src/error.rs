use jit_kitchen_store::StoreError;
use thiserror::Error;

/// Engine errors.
///
/// Only store infrastructure failures surface here. Everything expected
/// in normal operation (missing orders, throttled samples, provider outages,
/// lost trigger races) is reported through `Decision`, not through errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },
}
