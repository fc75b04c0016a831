use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("not enough funds for `{id}`: costs ${price:.2}, wallet has ${wallet:.2}")]
    InsufficientFunds { id: String, price: f64, wallet: f64 },

    #[error("unknown hardware `{0}`")]
    UnknownHardware(String),

    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),

    /// Zero or negative difficulty would make block resolution spin forever.
    #[error("algorithm `{algorithm}` has unusable block requirement {requirement}")]
    InvalidBlockRequirement { algorithm: String, requirement: f64 },

    #[error("invalid elapsed time {0}")]
    InvalidElapsed(f64),
}
