use thiserror::Error;

use crate::domain::forecast::ForecastId;
use crate::domain::recipe::RecipeId;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("invalid input for `{field}`: {message}")]
    InvalidInput { field: &'static str, message: String },
    #[error("insufficient sales history: {available} days available, at least {required} required")]
    InsufficientData { required: usize, available: usize },
    #[error("forecast computation failed: {0}")]
    Computation(String),
}

impl DomainError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput { field, message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("recipe {0} was not found")]
    RecipeNotFound(RecipeId),
    #[error("forecast {0} was not found")]
    ForecastNotFound(ForecastId),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable machine-readable error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidInput { .. }) => "invalid_input",
            Self::Domain(DomainError::InsufficientData { .. }) => "insufficient_data",
            Self::Domain(DomainError::Computation(_)) => "computation_failure",
            Self::RecipeNotFound(_) => "recipe_not_found",
            Self::ForecastNotFound(_) => "forecast_not_found",
            Self::Persistence(_) => "persistence_failure",
            Self::Configuration(_) => "configuration_failure",
        }
    }

    /// The offending field, when the failure can be pinned to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Domain(DomainError::InvalidInput { field, .. }) => Some(field),
            Self::Domain(DomainError::InsufficientData { .. }) => Some("history"),
            Self::RecipeNotFound(_) => Some("recipe_id"),
            Self::ForecastNotFound(_) => Some("forecast_id"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("insufficient history: {message}")]
    InsufficientHistory { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested recipe or forecast does not exist.",
            Self::InsufficientHistory { .. } => {
                "Not enough sales history to forecast. Record more sales and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::InsufficientHistory { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
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
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::InsufficientHistory { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::InvalidInput { .. }) => {
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::InsufficientData { .. }) => {
                Self::InsufficientHistory { message, correlation_id }
            }
            ApplicationError::RecipeNotFound(_) | ApplicationError::ForecastNotFound(_) => {
                Self::NotFound { message, correlation_id }
            }
            ApplicationError::Persistence(_) => Self::ServiceUnavailable { message, correlation_id },
            ApplicationError::Domain(DomainError::Computation(_))
            | ApplicationError::Configuration(_) => Self::Internal { message, correlation_id },
        }
    }
}
