use std::fmt;

/// Error types for building the collocation NLP
#[derive(Debug)]
pub enum CollocationError {
    /// non-positive number of intervals, empty model, bad horizon or malformed settings
    InvalidConfiguration(String),
    /// no coefficient table exists for this collocation degree
    UnsupportedDegree(usize),
    /// unknown Jacobian strategy flag (strict parsing only)
    UnrecognizedOption(String),
    /// a buffer could not be allocated or its size overflowed
    OutOfMemory { buffer: &'static str, len: usize },
    /// the model collaborator handed over inconsistent bounds or coloring data
    ModelContractViolation(String),
    Io(std::io::Error),
    Csv(csv::Error),
}

impl fmt::Display for CollocationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CollocationError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            CollocationError::UnsupportedDegree(deg) => write!(
                f,
                "Collocation degree {} is not supported (coefficients are tabulated for degree 3)",
                deg
            ),
            CollocationError::UnrecognizedOption(flag) => {
                write!(f, "Unrecognized jacobian strategy: {}", flag)
            }
            CollocationError::OutOfMemory { buffer, len } => write!(
                f,
                "failed to allocate buffer '{}' with {} elements",
                buffer, len
            ),
            CollocationError::ModelContractViolation(msg) => {
                write!(f, "Model contract violation: {}", msg)
            }
            CollocationError::Io(e) => write!(f, "I/O error: {}", e),
            CollocationError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for CollocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollocationError::Io(e) => Some(e),
            CollocationError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollocationError {
    fn from(e: std::io::Error) -> Self {
        CollocationError::Io(e)
    }
}

impl From<csv::Error> for CollocationError {
    fn from(e: csv::Error) -> Self {
        CollocationError::Csv(e)
    }
}

pub type Result<T> = std::result::Result<T, CollocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = CollocationError::UnsupportedDegree(4);
        assert!(e.to_string().contains("degree 4"));
        let e = CollocationError::OutOfMemory {
            buffer: "Vmin",
            len: 10,
        };
        assert_eq!(
            e.to_string(),
            "failed to allocate buffer 'Vmin' with 10 elements"
        );
        let e = CollocationError::InvalidConfiguration("nsi = 0".to_string());
        assert_eq!(e.to_string(), "Invalid configuration: nsi = 0");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: CollocationError = io.into();
        assert!(matches!(e, CollocationError::Io(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}
