use thiserror::Error;

/// Everything but `Transform` aborts the run. `Transform` covers a single field and is normally
/// rendered inline into the note.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("notebook tree integrity error: {0}")]
    Integrity(String),

    #[error("read failed ({context}): {source:#}")]
    Read {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("write failed ({context}): {source:#}")]
    Write {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot transform {field}: {message}")]
    Transform { field: String, message: String },

    #[error("library database error: {0}")]
    Source(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;

impl ImportError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }

    pub fn read(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Read {
            context: context.into(),
            source,
        }
    }

    pub fn write(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Write {
            context: context.into(),
            source,
        }
    }

    pub fn transform(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transform { .. })
    }

    #[must_use]
    pub fn remedy(&self) -> &'static str {
        match self {
            Self::Config(_) => "check the settings file and the library path",
            Self::Integrity(_) => "repair the notebook structure in the note store",
            Self::Read { .. } => "check that the note store is running and the token is valid",
            Self::Write { .. } => "re-run the import; existing notes are merged",
            Self::Transform { .. } => "the field was rendered with an inline error marker",
            Self::Source(_) => "check that the library database is a Calibre metadata.db",
        }
    }
}

#[must_use]
pub fn inline_error_marker(err: &ImportError) -> String {
    format!("<span style=\"color: red;\">{err}</span>")
}
