use crate::model::LessonId;
use crate::service::ServiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourseError {
    /// Missing or malformed user input, caught before any pipeline work.
    #[error("{0}")]
    Validation(String),

    #[error("Content generation failed: {context}: {source}")]
    Generation {
        context: String,
        #[source]
        source: ServiceError,
    },

    #[error("API quota exceeded (429). Generation was cancelled to avoid incomplete content; wait a few minutes and try again")]
    QuotaExceeded {
        #[source]
        source: ServiceError,
    },

    #[error("Image generation failed: {source}. Lesson generation was cancelled")]
    ImageGeneration {
        #[source]
        source: ServiceError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Syllabus not found: {0}")]
    SyllabusNotFound(String),

    #[error("Lesson {0} not found in the course structure")]
    LessonNotFound(LessonId),

    #[error("No generated content for lesson {0}")]
    MissingContent(LessonId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl CourseError {
    pub fn validation(message: impl Into<String>) -> Self {
        CourseError::Validation(message.into())
    }

    pub fn generation(context: impl Into<String>, source: ServiceError) -> Self {
        CourseError::Generation {
            context: context.into(),
            source,
        }
    }

    /// Like [`CourseError::generation`], but an exhausted quota becomes `QuotaExceeded`.
    pub fn from_service(context: impl Into<String>, source: ServiceError) -> Self {
        if source.is_quota_exhausted() {
            CourseError::QuotaExceeded { source }
        } else {
            CourseError::generation(context, source)
        }
    }

    /// True for failures of an external generation call.
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            CourseError::Generation { .. }
                | CourseError::QuotaExceeded { .. }
                | CourseError::ImageGeneration { .. }
        )
    }

    /// Failures worth re-running the same job for after a pause.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CourseError::QuotaExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, CourseError>;
