use thiserror::Error;

/// Failures of the chat pipeline. Moderation blocks, quota denials and
/// clarification short-circuits are regular outcomes and never show up here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("validation failure: {0}")]
    Validation(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("llm provider failure (status {status:?})")]
    Provider { status: Option<u16>, detail: Option<String> },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable { message: String, detail: Option<String>, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { code: &'static str, message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "telegramId and message are required",
            Self::UpstreamUnavailable { .. } => "LLM provider error",
            Self::Internal { code: "CONFIG_ERROR", .. } => "Service is not configured",
            Self::Internal { .. } => "Server error",
        }
    }

    /// Stable machine-readable code exposed in the `error.code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "VALIDATION_ERROR",
            Self::UpstreamUnavailable { .. } => "LLM_PROVIDER_ERROR",
            Self::Internal { code, .. } => *code,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::UpstreamUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::UpstreamUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Validation(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Provider { status, detail } => Self::UpstreamUnavailable {
                message: match status {
                    Some(code) => format!("provider returned status {code}"),
                    None => "provider request failed".to_owned(),
                },
                detail,
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) => Self::Internal {
                code: "SERVER_ERROR",
                message,
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message) => Self::Internal {
                code: "CONFIG_ERROR",
                message,
                correlation_id: "unassigned".to_owned(),
            },
        }
    }
}
