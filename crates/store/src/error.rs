//! Store error types

/// Error returned by the type operators
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid key size")]
    KeySize,

    #[error("invalid member size")]
    MemberSize,

    #[error("invalid value")]
    Value,

    /// A persisted key failed to decode; indicates on-disk corruption and is
    /// never masked.
    #[error("invalid encoded key")]
    InvalidEncoding,

    #[error("zset member score missing")]
    ScoreMiss,

    #[error("zset score overflow")]
    ScoreOverflow,

    #[error("invalid expire time")]
    ExpireValue,

    #[error("invalid db index {0}")]
    DbIndex(u8),

    #[error(transparent)]
    Engine(#[from] engine::EngineError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
