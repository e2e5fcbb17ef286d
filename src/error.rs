use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Unauthorized"))]
    Unauthorized,

    #[snafu(display("Request timestamp outside the accepted window"))]
    StaleRequest,

    #[snafu(display("Missing header: {header}"))]
    MissingHeader { header: String },

    #[snafu(display("Invalid header: {header}"))]
    InvalidHeader { header: String },

    #[snafu(display("Invalid payload: {message}"))]
    InvalidPayload { message: String },

    #[snafu(display("{name} is not set"))]
    MissingConfig { name: &'static str },

    #[snafu(display("Evaluator dispatch failed: {source}"))]
    Dispatch {
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Internal server error"))]
    InternalServerError {
        #[snafu(source(false))]
        source: Option<eyre::Report>,
    },
}

impl From<eyre::Report> for Error {
    fn from(e: eyre::Report) -> Self {
        Self::InternalServerError { source: Some(e) }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::InternalServerError {
            source: Some(e.into()),
        }
    }
}

impl Error {
    pub fn internal(e: impl Into<eyre::Report>) -> Self {
        Self::InternalServerError {
            source: Some(e.into()),
        }
    }

    pub fn dispatch(e: impl Into<eyre::Report>) -> Self {
        Self::Dispatch { source: e.into() }
    }

    pub fn missing_config(name: &'static str) -> Self {
        Self::MissingConfig { name }
    }

    pub fn invalid_payload(message: impl std::fmt::Display) -> Self {
        Self::InvalidPayload {
            message: message.to_string(),
        }
    }

    pub fn missing_header(header: impl Into<String>) -> Self {
        Self::MissingHeader {
            header: header.into(),
        }
    }

    pub fn invalid_header(header: impl Into<String>) -> Self {
        Self::InvalidHeader {
            header: header.into(),
        }
    }
}

impl actix_web::ResponseError for Error {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            Self::Unauthorized | Self::StaleRequest => actix_web::http::StatusCode::UNAUTHORIZED,

            Self::MissingHeader { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidPayload { .. } => actix_web::http::StatusCode::BAD_REQUEST,

            Self::Dispatch { .. } => actix_web::http::StatusCode::BAD_GATEWAY,

            Self::MissingConfig { .. } | Self::InternalServerError { .. } => {
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
