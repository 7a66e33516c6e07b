use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embed: empty image")]
    EmptyInput,

    #[error("embed: service unavailable: {0}")]
    Unavailable(String),

    #[error("embed: request timed out")]
    Timeout,

    #[error("embed: API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("embed: bad response: {0}")]
    Decode(String),
}
