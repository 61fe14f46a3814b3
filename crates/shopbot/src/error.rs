use thiserror::Error;

/// Errors raised while talking to the hosted services the bot depends on.
///
/// Nothing in the library retries or swallows these; a failure aborts the
/// current submission and surfaces to whoever drives the chat loop.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
