use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("out of stock: {requested} x `{item}` in `{category}`")]
    OutOfStock { category: String, item: String, requested: u32 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("upstream service failed with status {status}: {message}")]
    Upstream { status: u16, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("upstream failure ({status}): {message}")]
    UpstreamFailure { status: u16, message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

pub const DEFAULT_UPSTREAM_STATUS: u16 = 500;

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::UpstreamFailure { .. } => {
                "The conversation service could not handle the message. Please try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::UpstreamFailure { status, .. } => *status,
            Self::Internal { .. } => 500,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::UpstreamFailure { correlation_id, .. }
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
            | InterfaceError::UpstreamFailure { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::OutOfStock { .. }) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Upstream { status, message } => {
                // Anything outside the valid HTTP range is reported as a plain 500.
                let status = if (100..=599).contains(&status) {
                    status
                } else {
                    DEFAULT_UPSTREAM_STATUS
                };
                Self::UpstreamFailure { status, message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::ConfigurationMissing(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::OutOfStock {
            category: "drink".to_owned(),
            item: "latte".to_owned(),
            requested: 2,
        })
        .into_interface("turn-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "turn-1"
        ));
        assert_eq!(interface.status_code(), 400);
    }

    #[test]
    fn upstream_error_keeps_status_code() {
        let interface = ApplicationError::Upstream {
            status: 401,
            message: "unauthorized".to_owned(),
        }
        .into_interface("turn-2");

        assert_eq!(interface.status_code(), 401);
        assert_eq!(interface.correlation_id(), "turn-2");
        assert!(interface.user_message().contains("conversation service"));
    }

    #[test]
    fn invalid_upstream_status_defaults_to_500() {
        let interface =
            ApplicationError::Upstream { status: 0, message: "socket closed".to_owned() }
                .into_interface("turn-3");

        assert_eq!(interface.status_code(), 500);
    }

    #[test]
    fn configuration_missing_maps_to_internal() {
        let interface = ApplicationError::ConfigurationMissing("workspace id".to_owned())
            .into_interface("turn-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn out_of_stock_display_names_the_item() {
        let error = DomainError::OutOfStock {
            category: "food".to_owned(),
            item: "muffin".to_owned(),
            requested: 3,
        };
        assert_eq!(error.to_string(), "out of stock: 3 x `muffin` in `food`");
    }
}
