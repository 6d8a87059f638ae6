use thiserror::Error;

#[derive(Error, Debug)]
pub enum TeamForgeError {
    #[error("invalid value for {name}: {value} (must be {requirement})")]
    InvalidConfig {
        name: &'static str,
        value: f64,
        requirement: &'static str,
    },

    #[error("player not found: {0}")]
    PlayerNotFound(u64),

    #[error("index {index} out of bounds for pool of length {len}")]
    OutOfBounds { index: usize, len: usize },

    #[error("an asynchronous operation is already executing")]
    Busy,
}

pub type Result<T> = std::result::Result<T, TeamForgeError>;
