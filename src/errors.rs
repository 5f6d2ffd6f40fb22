//! Error types for the lease pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid timeout of {0} ms - must be -1 (infinite), 0 (immediate) or positive")]
    InvalidArgument(i64),

    #[error("pool has been disposed")]
    Disposed,

    #[error("no lease became available within {0} ms")]
    LeaseTimeout(i64),

    #[error("lease request was cancelled")]
    Cancelled,
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            PoolError::LeaseTimeout(50).to_string(),
            "no lease became available within 50 ms"
        );
        assert_eq!(
            PoolError::InvalidArgument(-2).to_string(),
            "invalid timeout of -2 ms - must be -1 (infinite), 0 (immediate) or positive"
        );
        assert_eq!(PoolError::Disposed.to_string(), "pool has been disposed");
    }
}
