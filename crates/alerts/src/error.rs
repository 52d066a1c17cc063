use thiserror::Error;

/// Failure to deliver one alert. Never retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Network or transport failure talking to Telegram.
    #[error("Telegram API error: {0}")]
    Telegram(teloxide::RequestError),

    /// The recipient answered and refused the message.
    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

impl From<teloxide::RequestError> for DeliveryError {
    fn from(err: teloxide::RequestError) -> Self {
        match err {
            teloxide::RequestError::Api(api) => DeliveryError::Rejected(api.to_string()),
            other => DeliveryError::Telegram(other),
        }
    }
}
