//! Error taxonomy and response envelope.
//!
//! Every service boundary returns `Result<T, ApiError>`. Handlers never
//! build ad-hoc error bodies: the `IntoResponse` impl here translates an
//! [`ApiError`] into the single JSON error envelope, and
//! [`success_response`] builds the matching success envelope.
//!
//! Envelope shapes:
//!
//! ```json
//! { "success": { "message", "timestamp", "status_code" }, "data": { ... } }
//! { "error": { "code", "title", "message", "suggestion", "category",
//!              "timestamp", "status_code", "details"? } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Stable error codes exposed to clients.
///
/// The wire form is the SCREAMING_SNAKE_CASE variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    AuthInvalidCredentials,
    AuthUserNotFound,
    AuthUserAlreadyExists,
    AuthInactiveUser,
    AuthTokenExpired,
    AuthInvalidToken,

    // Project management
    ProjectNotFound,
    ProjectAccessDenied,
    ProjectAlreadyExists,
    ProjectCreationFailed,

    // File handling
    FileUploadFailed,
    FileTypeNotSupported,
    FileSizeExceeded,
    FileNotFound,
    FileProcessingFailed,

    // Processing
    ProcessingNoFiles,
    ProcessingFailed,
    ProcessingPartialSuccess,

    // Vector database
    VectordbConnectionFailed,
    VectordbInsertFailed,
    VectordbSearchFailed,
    VectordbCollectionNotFound,

    // NLP / LLM
    NlpServiceUnavailable,
    NlpGenerationFailed,
    NlpNoRelevantContent,

    // System
    InternalError,
    ServiceUnavailable,
    ValidationError,
}

impl ErrorCode {
    /// User-facing title for this code.
    pub fn title(self) -> &'static str {
        match self {
            Self::AuthInvalidCredentials => "Authentication Failed",
            Self::AuthUserNotFound => "User Not Found",
            Self::AuthUserAlreadyExists => "Account Already Exists",
            Self::AuthInactiveUser => "Account Inactive",
            Self::AuthTokenExpired => "Session Expired",
            Self::AuthInvalidToken => "Invalid Session",
            Self::ProjectNotFound => "Project Not Found",
            Self::ProjectAccessDenied => "Access Denied",
            Self::ProjectAlreadyExists => "Project Already Exists",
            Self::ProjectCreationFailed => "Project Creation Failed",
            Self::FileUploadFailed => "File Upload Failed",
            Self::FileTypeNotSupported => "Unsupported File Type",
            Self::FileSizeExceeded => "File Too Large",
            Self::FileNotFound => "File Not Found",
            Self::FileProcessingFailed => "File Processing Failed",
            Self::ProcessingNoFiles => "No Files to Process",
            Self::ProcessingFailed => "Processing Failed",
            Self::ProcessingPartialSuccess => "Partial Processing Success",
            Self::VectordbConnectionFailed => "Database Connection Failed",
            Self::VectordbInsertFailed => "Database Insert Failed",
            Self::VectordbSearchFailed => "Search Failed",
            Self::VectordbCollectionNotFound => "Project Not Indexed",
            Self::NlpServiceUnavailable => "AI Service Unavailable",
            Self::NlpGenerationFailed => "Answer Generation Failed",
            Self::NlpNoRelevantContent => "No Relevant Content Found",
            Self::InternalError => "System Error",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::ValidationError => "Invalid Request",
        }
    }

    /// User-facing explanation of what went wrong.
    pub fn message(self) -> &'static str {
        match self {
            Self::AuthInvalidCredentials => {
                "The email or password you entered is incorrect. Please check your credentials and try again."
            }
            Self::AuthUserNotFound => "No account found with the provided email address.",
            Self::AuthUserAlreadyExists => "An account with this email address already exists.",
            Self::AuthInactiveUser => "Your account has been deactivated.",
            Self::AuthTokenExpired => "Your login session has expired. Please log in again.",
            Self::AuthInvalidToken => "Your login session is invalid or corrupted.",
            Self::ProjectNotFound => {
                "The requested project could not be found or you don't have access to it."
            }
            Self::ProjectAccessDenied => "You don't have permission to access this project.",
            Self::ProjectAlreadyExists => "A project with this ID already exists in your account.",
            Self::ProjectCreationFailed => "Unable to create the project due to a system error.",
            Self::FileUploadFailed => "The file could not be uploaded due to a system error.",
            Self::FileTypeNotSupported => {
                "This file type is not supported. We currently support PDF and text files."
            }
            Self::FileSizeExceeded => "The file size exceeds the maximum allowed limit.",
            Self::FileNotFound => "The requested file could not be found in the project.",
            Self::FileProcessingFailed => {
                "The file could not be processed due to an error in the content."
            }
            Self::ProcessingNoFiles => "There are no files in this project to process.",
            Self::ProcessingFailed => "Failed to process the files due to a system error.",
            Self::ProcessingPartialSuccess => {
                "Some files were processed successfully, but others failed."
            }
            Self::VectordbConnectionFailed => "Unable to connect to the vector database.",
            Self::VectordbInsertFailed => "Failed to store the processed data in the database.",
            Self::VectordbSearchFailed => {
                "Unable to search the database for relevant information."
            }
            Self::VectordbCollectionNotFound => {
                "This project has not been indexed yet or the index was corrupted."
            }
            Self::NlpServiceUnavailable => {
                "The AI service is currently unavailable or not properly configured."
            }
            Self::NlpGenerationFailed => "Unable to generate an answer to your question.",
            Self::NlpNoRelevantContent => {
                "No relevant information was found to answer your question."
            }
            Self::InternalError => "An unexpected error occurred in the system.",
            Self::ServiceUnavailable => "The service is temporarily unavailable.",
            Self::ValidationError => "The request contains invalid data or parameters.",
        }
    }

    /// Actionable follow-up for the user.
    pub fn suggestion(self) -> &'static str {
        match self {
            Self::AuthInvalidCredentials => {
                "Make sure your email is spelled correctly and your password meets the requirements."
            }
            Self::AuthUserNotFound => "Please check your email address or register a new account.",
            Self::AuthUserAlreadyExists => {
                "Try logging in instead, or use a different email address to register."
            }
            Self::AuthInactiveUser => "Please contact support to reactivate your account.",
            Self::AuthTokenExpired => {
                "For security reasons, sessions expire after a period of inactivity."
            }
            Self::AuthInvalidToken => "Please log out and log in again to refresh your session.",
            Self::ProjectNotFound => "Check the project ID or create a new project if needed.",
            Self::ProjectAccessDenied => {
                "Make sure you're logged in with the correct account that owns this project."
            }
            Self::ProjectAlreadyExists => {
                "Use a different project ID or access the existing project."
            }
            Self::ProjectCreationFailed => {
                "Please try again in a few moments. If the problem persists, contact support."
            }
            Self::FileUploadFailed => {
                "Check your internet connection and try again. Make sure the file is not corrupted."
            }
            Self::FileTypeNotSupported => {
                "Please convert your file to PDF or text format before uploading."
            }
            Self::FileSizeExceeded => {
                "Please compress the file or split it into smaller parts before uploading."
            }
            Self::FileNotFound => {
                "Check if the file was uploaded successfully or try uploading it again."
            }
            Self::FileProcessingFailed => {
                "Check if the file is readable and not corrupted. Try with a different file."
            }
            Self::ProcessingNoFiles => {
                "Upload some files to the project before attempting to process them."
            }
            Self::ProcessingFailed => {
                "Please try again. If the problem persists, contact support."
            }
            Self::ProcessingPartialSuccess => {
                "Check the failed files list and try processing them again."
            }
            Self::VectordbConnectionFailed => {
                "Please try again in a few moments. If the problem persists, contact support."
            }
            Self::VectordbInsertFailed => {
                "Please try again. If the problem persists, contact support."
            }
            Self::VectordbSearchFailed => {
                "Please try again. If the problem persists, contact support."
            }
            Self::VectordbCollectionNotFound => {
                "Process and index the project files before searching."
            }
            Self::NlpServiceUnavailable => {
                "Please try again later or check your API configuration."
            }
            Self::NlpGenerationFailed => "Try rephrasing your question or try again later.",
            Self::NlpNoRelevantContent => {
                "Try a different question or upload more relevant documents."
            }
            Self::InternalError => {
                "Please try again. If the problem persists, contact support."
            }
            Self::ServiceUnavailable => "Please try again in a few moments.",
            Self::ValidationError => "Please check your input and try again.",
        }
    }

    /// Coarse error category (`authentication`, `project`, `file`,
    /// `processing`, `database`, `nlp`, `system`).
    pub fn category(self) -> &'static str {
        match self {
            Self::AuthInvalidCredentials
            | Self::AuthUserNotFound
            | Self::AuthUserAlreadyExists
            | Self::AuthInactiveUser
            | Self::AuthTokenExpired
            | Self::AuthInvalidToken => "authentication",
            Self::ProjectNotFound
            | Self::ProjectAccessDenied
            | Self::ProjectAlreadyExists
            | Self::ProjectCreationFailed => "project",
            Self::FileUploadFailed
            | Self::FileTypeNotSupported
            | Self::FileSizeExceeded
            | Self::FileNotFound
            | Self::FileProcessingFailed => "file",
            Self::ProcessingNoFiles
            | Self::ProcessingFailed
            | Self::ProcessingPartialSuccess => "processing",
            Self::VectordbConnectionFailed
            | Self::VectordbInsertFailed
            | Self::VectordbSearchFailed
            | Self::VectordbCollectionNotFound => "database",
            Self::NlpServiceUnavailable
            | Self::NlpGenerationFailed
            | Self::NlpNoRelevantContent => "nlp",
            Self::InternalError | Self::ServiceUnavailable | Self::ValidationError => "system",
        }
    }

    /// Default HTTP status for this code. Raise sites may override per
    /// request via [`ApiError::with_status`].
    pub fn status(self) -> StatusCode {
        match self {
            Self::AuthInvalidCredentials
            | Self::AuthUserNotFound
            | Self::AuthInactiveUser
            | Self::AuthTokenExpired
            | Self::AuthInvalidToken => StatusCode::UNAUTHORIZED,
            Self::AuthUserAlreadyExists | Self::ProjectAlreadyExists => StatusCode::CONFLICT,
            Self::ProjectNotFound | Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::ProjectAccessDenied => StatusCode::FORBIDDEN,
            Self::ProjectCreationFailed
            | Self::FileUploadFailed
            | Self::FileTypeNotSupported
            | Self::FileSizeExceeded
            | Self::FileProcessingFailed
            | Self::ProcessingNoFiles
            | Self::ProcessingFailed
            | Self::ProcessingPartialSuccess
            | Self::NlpNoRelevantContent
            | Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::VectordbConnectionFailed
            | Self::VectordbInsertFailed
            | Self::VectordbSearchFailed
            | Self::VectordbCollectionNotFound
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NlpServiceUnavailable
            | Self::NlpGenerationFailed
            | Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Wire form of the code (e.g. `PROJECT_NOT_FOUND`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthInvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            Self::AuthUserNotFound => "AUTH_USER_NOT_FOUND",
            Self::AuthUserAlreadyExists => "AUTH_USER_ALREADY_EXISTS",
            Self::AuthInactiveUser => "AUTH_INACTIVE_USER",
            Self::AuthTokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::AuthInvalidToken => "AUTH_INVALID_TOKEN",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::ProjectAccessDenied => "PROJECT_ACCESS_DENIED",
            Self::ProjectAlreadyExists => "PROJECT_ALREADY_EXISTS",
            Self::ProjectCreationFailed => "PROJECT_CREATION_FAILED",
            Self::FileUploadFailed => "FILE_UPLOAD_FAILED",
            Self::FileTypeNotSupported => "FILE_TYPE_NOT_SUPPORTED",
            Self::FileSizeExceeded => "FILE_SIZE_EXCEEDED",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::FileProcessingFailed => "FILE_PROCESSING_FAILED",
            Self::ProcessingNoFiles => "PROCESSING_NO_FILES",
            Self::ProcessingFailed => "PROCESSING_FAILED",
            Self::ProcessingPartialSuccess => "PROCESSING_PARTIAL_SUCCESS",
            Self::VectordbConnectionFailed => "VECTORDB_CONNECTION_FAILED",
            Self::VectordbInsertFailed => "VECTORDB_INSERT_FAILED",
            Self::VectordbSearchFailed => "VECTORDB_SEARCH_FAILED",
            Self::VectordbCollectionNotFound => "VECTORDB_COLLECTION_NOT_FOUND",
            Self::NlpServiceUnavailable => "NLP_SERVICE_UNAVAILABLE",
            Self::NlpGenerationFailed => "NLP_GENERATION_FAILED",
            Self::NlpNoRelevantContent => "NLP_NO_RELEVANT_CONTENT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::ValidationError => "VALIDATION_ERROR",
        }
    }
}

/// Application-wide error carried across service boundaries.
#[derive(Debug, thiserror::Error)]
#[error("{code:?}")]
pub struct ApiError {
    code: ErrorCode,
    status: Option<StatusCode>,
    details: Option<Value>,
}

impl ApiError {
    /// Error with the code's default status and no details.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            status: None,
            details: None,
        }
    }

    /// Attach a `details` object to the envelope.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the HTTP status for this raise site.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// The taxonomy code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Effective HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.code.status())
    }

    /// Unexpected failure: logs the underlying cause, maps to
    /// `INTERNAL_ERROR` 500. The cause never reaches the client.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(%cause, "internal error");
        Self::new(ErrorCode::InternalError)
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = json!({
            "code": self.code.as_str(),
            "title": self.code.title(),
            "message": self.code.message(),
            "suggestion": self.code.suggestion(),
            "category": self.code.category(),
            "timestamp": Utc::now().to_rfc3339(),
            "status_code": status.as_u16(),
        });
        if let Some(details) = self.details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// A specialized Result type for quarry service and handler boundaries.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the standard success envelope.
pub fn success_response(message: &str, data: Value, status: StatusCode) -> Response {
    let body = json!({
        "success": {
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
            "status_code": status.as_u16(),
        },
        "data": data,
    });

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_wire_form() {
        assert_eq!(ErrorCode::ProjectNotFound.as_str(), "PROJECT_NOT_FOUND");
        assert_eq!(
            ErrorCode::NlpServiceUnavailable.as_str(),
            "NLP_SERVICE_UNAVAILABLE"
        );
        assert_eq!(
            serde_json::to_value(ErrorCode::FileSizeExceeded).unwrap(),
            json!("FILE_SIZE_EXCEEDED")
        );
    }

    #[test]
    fn test_default_statuses() {
        assert_eq!(ErrorCode::AuthInvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::ProjectAlreadyExists.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ProjectNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::FileSizeExceeded.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::NlpServiceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::VectordbInsertFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_status_override() {
        let err = ApiError::new(ErrorCode::VectordbSearchFailed)
            .with_status(StatusCode::BAD_REQUEST);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_every_code_has_a_category() {
        let categories = [
            "authentication",
            "project",
            "file",
            "processing",
            "database",
            "nlp",
            "system",
        ];
        for code in [
            ErrorCode::AuthInvalidCredentials,
            ErrorCode::ProjectNotFound,
            ErrorCode::FileUploadFailed,
            ErrorCode::ProcessingNoFiles,
            ErrorCode::VectordbSearchFailed,
            ErrorCode::NlpGenerationFailed,
            ErrorCode::InternalError,
        ] {
            assert!(categories.contains(&code.category()));
            assert!(!code.title().is_empty());
            assert!(!code.message().is_empty());
            assert!(!code.suggestion().is_empty());
        }
    }
}
