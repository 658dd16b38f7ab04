#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpinRejected {
    #[error("not enough coins: have {coins}, a spin costs {cost}")]
    InsufficientCoins { coins: i64, cost: i64 },
    #[error("a round is already in progress")]
    RoundInProgress,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage backend: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
