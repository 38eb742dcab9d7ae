use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Every failure the gateway can produce, from startup through field
/// resolution.
///
/// Resolver failures are turned into field-level GraphQL errors through
/// [`ErrorExtensions`], carrying [`GatewayError::code`] under
/// `extensions.code`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The upstream REST service could not be reached or answered with a
    /// non-success status.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// The upstream answered with a payload that does not match the
    /// expected shape.
    #[error("failed to decode upstream payload: {message}")]
    Decode { message: String },

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The relational store refused an insert or update.
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Two resolvers were bound to the same field coordinate.
    #[error("field {coordinate} is bound to more than one resolver")]
    SchemaConflict { coordinate: String },

    /// A root field declared in the schema has no resolver.
    #[error("field {coordinate} has no resolver")]
    UnresolvedField { coordinate: String },

    /// A resolver is bound to a field the schema does not declare.
    #[error("resolver bound to undeclared field {coordinate}")]
    UnknownField { coordinate: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        GatewayError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        GatewayError::Config {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        GatewayError::InvalidInput {
            message: message.into(),
        }
    }

    /// Machine-readable error code reported to GraphQL clients.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            GatewayError::Decode { .. } => "DECODE_ERROR",
            GatewayError::NotFound { .. } => "NOT_FOUND",
            GatewayError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            GatewayError::SchemaConflict { .. } => "SCHEMA_CONFLICT",
            GatewayError::UnresolvedField { .. }
            | GatewayError::UnknownField { .. }
            | GatewayError::InvalidSchema { .. } => "SCHEMA_ERROR",
            GatewayError::InvalidInput { .. } => "BAD_USER_INPUT",
            GatewayError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            GatewayError::Config { .. } => "CONFIG_ERROR",
            GatewayError::Internal { .. } | GatewayError::Io(_) => "INTERNAL",
        }
    }
}

impl ErrorExtensions for GatewayError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, extensions| {
            extensions.set("code", code);
        })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            GatewayError::Decode {
                message: error.to_string(),
            }
        } else {
            GatewayError::UpstreamUnavailable {
                message: error.to_string(),
            }
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(error: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match error {
            sqlx::Error::Database(db_error) => match db_error.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
                | ErrorKind::ForeignKeyViolation => GatewayError::ConstraintViolation {
                    message: db_error.message().to_string(),
                },
                _ => GatewayError::StoreUnavailable {
                    message: db_error.message().to_string(),
                },
            },
            other => GatewayError::StoreUnavailable {
                message: other.to_string(),
            },
        }
    }
}
