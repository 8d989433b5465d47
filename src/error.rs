/// Broad failure category.
///
/// The category decides the process exit code and tells callers which unit of
/// work is affected: the whole batch (`DataFormat`), every series (`ModelFit`),
/// or only the export step (`Export`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid command-line input (out-of-range horizon, bad path, ...).
    Usage,
    /// Malformed or missing date/value columns in the input table.
    DataFormat,
    /// A model could not be fit or forecast.
    ModelFit,
    /// Writing an output file failed.
    Export,
    /// Terminal setup or I/O failure in the TUI.
    Terminal,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Usage => 2,
            ErrorKind::DataFormat => 3,
            ErrorKind::ModelFit => 4,
            ErrorKind::Export => 5,
            ErrorKind::Terminal => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Usage => "usage error",
            ErrorKind::DataFormat => "data format error",
            ErrorKind::ModelFit => "model fit error",
            ErrorKind::Export => "export error",
            ErrorKind::Terminal => "terminal error",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataFormat, message)
    }

    pub fn model_fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelFit, message)
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Export, message)
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Terminal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        let kinds = [
            ErrorKind::Usage,
            ErrorKind::DataFormat,
            ErrorKind::ModelFit,
            ErrorKind::Export,
            ErrorKind::Terminal,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn display_prefixes_kind_label() {
        let err = AppError::data_format("Missing date column.");
        assert_eq!(err.to_string(), "data format error: Missing date column.");
        assert_eq!(err.exit_code(), 3);
    }
}
