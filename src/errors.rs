use std::fmt;

/// Errors the core surfaces to its caller. Only [`PropertyStoreError::OverflowAborted`]
/// and [`PropertyStoreError::DictionaryMiss`] indicate a structural invariant
/// violation rather than ordinary recoverable input; callers should treat
/// those two as fatal and not retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyStoreError {
    /// The embedding layer received a request it could not decode.
    InputMalformed(String),
    /// Pass 2 looked up a name that pass 1 never interned. Indicates a
    /// `TransactionSource` that is not actually restartable.
    DictionaryMiss(String),
    /// The total inserted transaction count would exceed `u32::MAX`; all
    /// counts in this store are 32-bit.
    OverflowAborted,
    /// A persisted tree failed to parse: bad magic, truncated record, or a
    /// legacy format with no sentinel root.
    SerializationCorrupt(String),
    /// A workflow configuration document failed validation.
    ConfigurationInvalid(String),
}

impl std::error::Error for PropertyStoreError {}

impl fmt::Display for PropertyStoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyStoreError::InputMalformed(msg) => {
                write!(f, "Error: malformed input: {msg}")
            }
            PropertyStoreError::DictionaryMiss(name) => {
                write!(
                    f,
                    "Error: property '{name}' seen in pass 2 but not interned \
                    during pass 1; the transaction source is not restartable."
                )
            }
            PropertyStoreError::OverflowAborted => write!(
                f,
                "Error: transaction count would overflow a 32-bit counter; \
                 aborting before any count becomes invalid."
            ),
            PropertyStoreError::SerializationCorrupt(msg) => {
                write!(f, "Error: corrupt persisted tree: {msg}")
            }
            PropertyStoreError::ConfigurationInvalid(msg) => {
                write!(f, "Error: invalid workflow configuration: {msg}")
            }
        }
    }
}

/// An error that leaves the store in a state the caller must not continue
/// using. The builder's overflow guard and pass-2 dictionary misses both
/// raise this instead of returning cleanly.
#[derive(Debug, Clone)]
pub struct FatalError(pub PropertyStoreError);

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error: a fatal error has occurred ({}). The build must be \
             considered corrupted and restarted from an empty tree.",
            self.0
        )
    }
}

pub type FatalResult<T> = Result<T, FatalError>;

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}
