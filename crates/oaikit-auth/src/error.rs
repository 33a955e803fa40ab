#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("api key must not be empty")]
    EmptyKey,

    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
