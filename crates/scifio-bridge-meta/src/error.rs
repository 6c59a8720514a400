/// Errors that can occur while decoding metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// A required key is absent from the dictionary.
    #[error("{0} is not in the metadata dictionary")]
    MissingKey(String),

    /// A value could not be converted to the requested type.
    #[error("error while converting {key}={value:?} to {ty}")]
    Conversion {
        key: String,
        value: String,
        ty: &'static str,
    },

    /// The `PixelType` code does not name a known component type.
    #[error("unknown pixel type: {0}")]
    UnknownPixelType(i64),

    /// A region cannot be expressed in the five-axis protocol.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// The lookup table keys are inconsistent.
    #[error("invalid lookup table: {0}")]
    InvalidLookupTable(String),
}

pub type Result<T> = std::result::Result<T, MetaError>;
