use std::path::PathBuf;

/// Any failure that aborts a directory resolution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{location}: {source}")]
    Eval {
        location: String,
        #[source]
        source: EvalError,
    },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl Error {
    pub(crate) fn eval(location: impl Into<String>, source: EvalError) -> Self {
        Error::Eval {
            location: location.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("open {}: no such file or directory", path.display())]
    MissingDirectory { path: PathBuf },
    #[error("reading {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{file}: {message}")]
    Syntax { file: String, message: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unsupported attribute '{name}' on {on}")]
    UnknownAttribute { name: String, on: String },
    #[error("call to unknown function '{0}'")]
    UnknownFunction(String),
    #[error("error in function '{name}': {message}")]
    Function { name: String, message: String },
    #[error("{0}")]
    TypeMismatch(String),
    #[error("duplicate key '{0}' in for expression; use '...' to group values")]
    DuplicateKey(String),
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("invalid {kind}: {message}")]
    InvalidRepetition { kind: &'static str, message: String },
    #[error("unsupported expression: {0}")]
    Unsupported(String),
}

impl EvalError {
    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch(message.into())
    }

    /// True when the failure only concerns a `local.*` name that may not
    /// have been evaluated yet.
    pub(crate) fn is_pending_local(&self) -> bool {
        matches!(self, EvalError::UnknownAttribute { on, .. } if on == "local")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("module cycle detected: {}", format_chain(chain))]
    Cycle { chain: Vec<PathBuf> },
    #[error("module '{label}': cannot locate source '{address}'")]
    ModuleNotFound { label: String, address: String },
    #[error("module '{label}' is missing its 'source' attribute")]
    MissingSource { label: String },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_mentions_filesystem_diagnostic() {
        let err = Error::from(ParseError::MissingDirectory {
            path: PathBuf::from("/tmp/xyz"),
        });
        assert!(err.to_string().contains("no such file or directory"));
        assert!(err.to_string().contains("/tmp/xyz"));
    }

    #[test]
    fn cycle_error_lists_full_chain() {
        let err = ResolutionError::Cycle {
            chain: vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/a")],
        };
        assert_eq!(err.to_string(), "module cycle detected: /a -> /b -> /a");
    }
}
