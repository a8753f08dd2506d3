//! Module for the error management
use std::fmt;
use thiserror::Error;

/// Where in a file an error was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The header row of a tabular file
    Header,
    /// A 1-based line of a tabular file (the header is line 1)
    Line(u64),
    /// A path inside a tree document, e.g. `features[2].geometry`
    Path(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Header => write!(f, "1"),
            Location::Line(line) => write!(f, "{}", line),
            Location::Path(path) if path.is_empty() => write!(f, "$"),
            Location::Path(path) => write!(f, "$.{}", path),
        }
    }
}

/// A raw value that could not be converted into its declared type
///
/// It carries no file context, the caller wraps it into [Error::Conversion]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} (raw = {raw:?})")]
pub struct ConversionError {
    /// The offending raw text
    pub raw: String,
    /// Why the conversion failed
    pub reason: String,
}

impl ConversionError {
    pub(crate) fn new(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

/// An error that can occur when loading or patching GTFS data.
#[derive(Error, Debug)]
pub enum Error {
    /// A required file is absent from the feed directory, or has no header row
    #[error("{file_name}: required file is {reason}")]
    MissingRequiredFile {
        /// The missing file
        file_name: String,
        /// `missing` or `empty`
        reason: &'static str,
    },
    /// A required field is absent from a header, or null in a tree document
    #[error("{file_name}:{location}: missing required field {field}")]
    MissingRequiredField {
        /// File in which the field is missing
        file_name: String,
        /// Header or document path
        location: Location,
        /// The missing field
        field: String,
    },
    /// A required column is present but blank on a row
    #[error("{file_name}:{location}: required field {field} is empty")]
    EmptyRequiredValue {
        /// File containing the row
        file_name: String,
        /// Line of the row
        location: Location,
        /// The blank field
        field: String,
    },
    /// A raw value could not be parsed as the declared type of its field
    #[error("{file_name}:{location} field {field} = {raw:?}: {reason}")]
    Conversion {
        /// File containing the value
        file_name: String,
        /// Line or document path of the value
        location: Location,
        /// Field being converted
        field: String,
        /// The offending raw text
        raw: String,
        /// Why the conversion failed
        reason: String,
    },
    /// The static schema declares a shape the converter cannot handle
    #[error("misconfigured schema: {0}")]
    MisconfiguredSchema(String),
    /// Impossible to read or write a named file
    #[error("impossible to access '{file_name}'")]
    NamedFileIO {
        /// The file name that could not be accessed
        file_name: String,
        /// The inital error
        #[source]
        source: std::io::Error,
    },
    /// Impossible to read or write a CSV file
    #[error("impossible to process csv file '{file_name}'")]
    CSVError {
        /// File name of the CSV file
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
    },
    /// Impossible to read or write a JSON document
    #[error("impossible to process json file '{file_name}'")]
    JsonError {
        /// File name of the JSON document
        file_name: String,
        /// The initial error by serde_json
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn conversion(
        file_name: &str,
        location: Location,
        field: &str,
        err: ConversionError,
    ) -> Self {
        Error::Conversion {
            file_name: file_name.to_owned(),
            location,
            field: field.to_owned(),
            raw: err.raw,
            reason: err.reason,
        }
    }

    pub(crate) fn named_io(file_name: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
        move |source| Error::NamedFileIO {
            file_name: file_name.to_owned(),
            source,
        }
    }
}

/// Result type of the crate
pub type Result<T> = std::result::Result<T, Error>;
