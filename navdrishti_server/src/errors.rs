use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use gateway_tools::GatewayApiError;
use log::error;
use navdrishti_engine::{
    api::guards::TransitionForbidden,
    InventoryError,
    OrderFlowError,
    OrderQueryError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Auth token signature invalid or not provided")]
    CouldNotDeserializeAuthToken,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Conflict. {0}")]
    Conflict(String),
    // Deliberately carries no detail about which part of the signature failed.
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("The payment gateway could not be reached. Please try again. {0}")]
    PaymentGatewayUnavailable(String),
    #[error("The shipping carrier could not be reached. Please try again. {0}")]
    CarrierUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializeAuthToken => StatusCode::UNAUTHORIZED,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentGatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::CarrierUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Requests from this peer are not accepted.")]
    ForbiddenPeer,
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) | OrderFlowError::OrderIdNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::PaymentNotFound(_) | OrderFlowError::ShipmentNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            OrderFlowError::InvalidStateTransition { .. } => Self::Conflict(e.to_string()),
            OrderFlowError::Inventory(inv) => Self::from(inv),
            OrderFlowError::Query(q) => Self::from(q),
            OrderFlowError::BuyerIsSeller
            | OrderFlowError::EmptyOrder
            | OrderFlowError::MixedSellers
            | OrderFlowError::AmountMismatch { .. }
            | OrderFlowError::InvalidRefundAmount(_)
            | OrderFlowError::RefundExceedsCapture { .. } => Self::InvalidRequestBody(e.to_string()),
            OrderFlowError::PaymentNotCaptured(_) | OrderFlowError::PaymentAlreadyExists(_) => {
                Self::Conflict(e.to_string())
            },
            OrderFlowError::ShipmentAlreadyExists(_) => Self::Conflict(e.to_string()),
            OrderFlowError::DatabaseError(_) => {
                error!("💻️ Order flow backend failure: {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<InventoryError> for ServerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::ItemNotFound(_) => Self::NoRecordFound(e.to_string()),
            InventoryError::InsufficientStock { .. } | InventoryError::ItemNotActive(_) => {
                Self::Conflict(e.to_string())
            },
            InventoryError::InvalidQuantity(_) => Self::InvalidRequestBody(e.to_string()),
            InventoryError::DatabaseError(_) => {
                error!("💻️ Inventory backend failure: {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<OrderQueryError> for ServerError {
    fn from(e: OrderQueryError) -> Self {
        match e {
            OrderQueryError::OrderDoesNotExist(_) => Self::NoRecordFound(e.to_string()),
            OrderQueryError::DatabaseError(_) => {
                error!("💻️ Order query backend failure: {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<TransitionForbidden> for ServerError {
    fn from(e: TransitionForbidden) -> Self {
        Self::InsufficientPermissions(e.to_string())
    }
}

impl From<GatewayApiError> for ServerError {
    fn from(e: GatewayApiError) -> Self {
        error!("💻️ Payment gateway call failed: {e}");
        Self::PaymentGatewayUnavailable(e.to_string())
    }
}
