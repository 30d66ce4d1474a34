use std::fmt;

/// Input field a validation error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Amount,
    Recipient,
    Title,
    Description,
    Proposal,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Amount => "amount",
            Field::Recipient => "recipient",
            Field::Title => "title",
            Field::Description => "description",
            Field::Proposal => "proposal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Submission,
    Confirmation,
    Read,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Missing or malformed contract address, disconnected wallet, wrong network
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: Field, message: String },

    /// Signing rejected or node unreachable at broadcast time
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Transaction mined but reverted
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("An operation is already in flight")]
    InFlight,
}

impl ClientError {
    pub fn validation(field: Field, message: impl Into<String>) -> Self {
        ClientError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Config(_) => ErrorKind::Configuration,
            ClientError::Validation { .. } => ErrorKind::Validation,
            ClientError::Submission(_) => ErrorKind::Submission,
            ClientError::Reverted(_) => ErrorKind::Confirmation,
            ClientError::Read(_) => ErrorKind::Read,
            ClientError::InFlight => ErrorKind::Busy,
        }
    }

    /// Field the error should be rendered next to, if any
    pub fn field(&self) -> Option<Field> {
        match self {
            ClientError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}
