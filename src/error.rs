//! Error taxonomy shared by the remote functions, the lifecycle engine and the
//! client, plus the uniform `{success, data | error}` envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::BookingStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    MissingParameters,
    InvalidParameter,
    NotFound,
    Forbidden,
    InvalidStatus,
    IllegalTransition,
    NotAPhotographer,
    RemoteUnavailable,
    Internal,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("caller is not a photographer")]
    NotAPhotographer,

    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Unexpected storage failure inside a remote handler.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::MissingParameters(_) => ErrorKind::MissingParameters,
            ServiceError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::InvalidStatus(_) => ErrorKind::InvalidStatus,
            ServiceError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            ServiceError::NotAPhotographer => ErrorKind::NotAPhotographer,
            ServiceError::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only connectivity failures may be retried; everything else is a caller
    /// or data bug and is surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::RemoteUnavailable(_))
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Internal(format!("{err:#}"))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Wire shape returned by every remote operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorKind>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(error: &ServiceError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            code: Some(error.kind()),
        }
    }
}

impl<T> From<ServiceResult<T>> for Envelope<T> {
    fn from(result: ServiceResult<T>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(err) => Envelope::err(&err),
        }
    }
}
