//! Error types for COLLADA loading
//!
//! Two layers live here. [`Error`] is the crate's `Result` error, carried
//! through `?` inside the loader. [`ParserError`] is the structured report
//! handed to the injected [`ErrorHandler`] while a document is being loaded;
//! the loader never surfaces a problem through both channels at once.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML and grammar errors
//! - **E3xxx**: Model and reference errors
//! - **E4xxx**: Unsupported features
//! - **E5xxx**: Writer and abort errors

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Additional context for errors
///
/// Provides optional supplementary information to help with debugging:
/// - The document the error occurred in
/// - Line and column numbers (1-based, when known)
/// - A hint for resolving common issues
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// The document URI where the error occurred
    pub file: Option<String>,

    /// Line number where the error occurred
    pub line: Option<usize>,

    /// Column number where the error occurred
    pub column: Option<usize>,

    /// A helpful hint for resolving the error
    pub hint: Option<String>,
}

impl ErrorContext {
    /// Create a new empty error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file location
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the line number
    pub fn line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the column number
    pub fn column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Set the hint
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref file) = self.file {
            parts.push(format!("File: {}", file));
        }

        if let (Some(line), Some(column)) = (self.line, self.column) {
            parts.push(format!("Location: line {}, column {}", line, column));
        } else if let Some(line) = self.line {
            parts.push(format!("Line: {}", line));
        }

        if let Some(ref hint) = self.hint {
            parts.push(format!("Hint: {}", hint));
        }

        if !parts.is_empty() {
            write!(f, "\n{}", parts.join("\n"))
        } else {
            Ok(())
        }
    }
}

/// Errors that can occur while loading COLLADA documents
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading a document
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - File not found
    /// - Insufficient permissions
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error while reading a `.zae` package
    ///
    /// **Error Code**: E1002
    #[cfg(feature = "zae")]
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required file is missing (document or archive entry)
    ///
    /// **Error Code**: E1003
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// A document location could not be turned into a URI
    ///
    /// **Error Code**: E1004
    #[error("[E1004] Invalid URI: {0}")]
    InvalidUri(String),

    /// XML well-formedness error reported by the tokenizer
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Malformed XML syntax
    /// - Unclosed or mismatched tags
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute syntax error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure or text decoding failure
    ///
    /// **Error Code**: E2003
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Element not allowed at this position by the COLLADA grammar
    ///
    /// **Error Code**: E2004
    #[error("[E2004] Unexpected element <{element}> inside <{parent}>")]
    UnexpectedElement {
        /// Element name of the parent
        parent: String,
        /// Element name that was found
        element: String,
    },

    /// Required attribute missing on an element
    ///
    /// **Error Code**: E2005
    #[error("[E2005] Element '<{element}>' is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Element name
        element: String,
        /// Missing attribute name
        attribute: String,
    },

    /// Attribute not declared for an element
    ///
    /// **Error Code**: E2006
    #[error("[E2006] Unknown attribute '{attribute}' on <{element}>")]
    UnknownAttribute {
        /// Element name
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// Child element occurs too often or not often enough
    ///
    /// **Error Code**: E2007
    #[error("[E2007] Cardinality violation: {0}")]
    Cardinality(String),

    /// Invalid model structure or inconsistent data
    ///
    /// **Error Code**: E3001
    #[error("[E3001] Invalid model: {0}")]
    InvalidModel(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    ///
    /// **Suggestions**:
    /// - Verify numeric values use proper format (e.g., "1.5" not "1,5")
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// Reference that never resolved to a document element
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Unresolved reference '{target}' from <{element}>")]
    DanglingReference {
        /// Element that holds the reference
        element: String,
        /// URI or sid address that did not resolve
        target: String,
    },

    /// The same URI was claimed for two different object kinds
    ///
    /// **Error Code**: E3004
    #[error("[E3004] '{uri}' already registered as {existing}, requested as {requested}")]
    IdClassMismatch {
        /// The URI in question
        uri: String,
        /// Kind it was first registered as
        existing: String,
        /// Kind requested now
        requested: String,
    },

    /// The same id defined twice in one document
    ///
    /// **Error Code**: E3005
    #[error("[E3005] Duplicate id '{0}'")]
    DuplicateId(String),

    /// Unsupported feature
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Unsupported feature: {0}")]
    Unsupported(String),

    /// The writer rejected an object
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Writer failed: {0}")]
    WriterFailed(String),

    /// Loading was stopped on request of the error handler
    ///
    /// **Error Code**: E5002
    #[error("[E5002] Loading aborted: {0}")]
    Aborted(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUri(err.to_string())
    }
}

impl Error {
    /// Create a MissingAttribute error
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    /// Create a ParseError with context about what was being parsed
    ///
    /// # Arguments
    /// * `field_name` - The name of the field being parsed (e.g., "float_array value")
    /// * `value` - The value that failed to parse
    /// * `expected_type` - The expected type (e.g., "floating-point number")
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'",
            field_name, expected_type, value
        ))
    }

    /// Create a DanglingReference error
    pub fn dangling(element: &str, target: impl fmt::Display) -> Self {
        Error::DanglingReference {
            element: element.to_string(),
            target: target.to_string(),
        }
    }

    /// The code reported to error handlers for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Io(_) => ErrorCode::CouldNotOpenFile,
            #[cfg(feature = "zae")]
            Error::Zip(_) => ErrorCode::Archive,
            Error::MissingFile(_) => ErrorCode::CouldNotOpenFile,
            Error::InvalidUri(_) => ErrorCode::InvalidUri,
            Error::Xml(_) => ErrorCode::XmlParserError,
            Error::XmlAttr(_) => ErrorCode::AttributeParse,
            Error::InvalidXml(_) => ErrorCode::InvalidXml,
            Error::UnexpectedElement { .. } => ErrorCode::UnexpectedElement,
            Error::MissingAttribute { .. } => ErrorCode::MissingAttribute,
            Error::UnknownAttribute { .. } => ErrorCode::UnknownAttribute,
            Error::Cardinality(_) => ErrorCode::Cardinality,
            Error::InvalidModel(_) => ErrorCode::InvalidModel,
            Error::ParseError(_) => ErrorCode::NumericParse,
            Error::DanglingReference { .. } => ErrorCode::DanglingReference,
            Error::IdClassMismatch { .. } => ErrorCode::IdClassMismatch,
            Error::DuplicateId(_) => ErrorCode::DuplicateId,
            Error::Unsupported(_) => ErrorCode::Unsupported,
            Error::WriterFailed(_) => ErrorCode::WriterFailed,
            Error::Aborted(_) => ErrorCode::Aborted,
        }
    }
}

/// How serious a reported problem is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Schema deviation that was absorbed; loading continues
    Warning,
    /// The affected element or object is dropped
    Error,
    /// Loading cannot continue
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        })
    }
}

/// Kind of a reported problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Document could not be opened or read
    CouldNotOpenFile,
    /// Archive could not be read
    Archive,
    /// Location could not be expressed as a URI
    InvalidUri,
    /// Tokenizer reported malformed XML
    XmlParserError,
    /// Attribute syntax error
    AttributeParse,
    /// Structural or decoding error
    InvalidXml,
    /// Element not allowed by the grammar
    UnexpectedElement,
    /// Required attribute absent
    MissingAttribute,
    /// Attribute not declared for the element
    UnknownAttribute,
    /// Too many or too few occurrences of a child
    Cardinality,
    /// Inconsistent document data
    InvalidModel,
    /// Malformed numeric token
    NumericParse,
    /// Reference never resolved
    DanglingReference,
    /// URI registered for two kinds
    IdClassMismatch,
    /// Id defined twice in one document
    DuplicateId,
    /// Feature not supported
    Unsupported,
    /// Writer returned failure
    WriterFailed,
    /// Handler requested a stop
    Aborted,
}

impl ErrorCode {
    /// Numeric code as shown in [`Error`] messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CouldNotOpenFile => "E1001",
            ErrorCode::Archive => "E1002",
            ErrorCode::InvalidUri => "E1004",
            ErrorCode::XmlParserError => "E2001",
            ErrorCode::AttributeParse => "E2002",
            ErrorCode::InvalidXml => "E2003",
            ErrorCode::UnexpectedElement => "E2004",
            ErrorCode::MissingAttribute => "E2005",
            ErrorCode::UnknownAttribute => "E2006",
            ErrorCode::Cardinality => "E2007",
            ErrorCode::InvalidModel => "E3001",
            ErrorCode::NumericParse => "E3002",
            ErrorCode::DanglingReference => "E3003",
            ErrorCode::IdClassMismatch => "E3004",
            ErrorCode::DuplicateId => "E3005",
            ErrorCode::Unsupported => "E4001",
            ErrorCode::WriterFailed => "E5001",
            ErrorCode::Aborted => "E5002",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem reported to an [`ErrorHandler`] during loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    /// How serious the problem is
    pub severity: Severity,
    /// What kind of problem it is
    pub code: ErrorCode,
    /// Human readable description
    pub message: String,
    /// Document and location
    pub context: ErrorContext,
}

impl ParserError {
    /// Build a report from a crate error
    pub fn new(severity: Severity, error: &Error, context: ErrorContext) -> Self {
        Self {
            severity,
            code: error.code(),
            message: error.to_string(),
            context,
        }
    }

    /// Line of the report, 0 when unknown
    pub fn line(&self) -> usize {
        self.context.line.unwrap_or(0)
    }

    /// Column of the report, 0 when unknown
    pub fn column(&self) -> usize {
        self.context.column.unwrap_or(0)
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}{}", self.severity, self.message, self.context)
    }
}

/// Receives every problem found while loading
///
/// Returning `false` asks the loader to stop as soon as possible; returning
/// `true` continues despite the problem. Critical problems stop the load
/// regardless of the answer.
pub trait ErrorHandler {
    /// Handle one reported problem
    fn handle_error(&mut self, error: &ParserError) -> bool;
}

impl<F> ErrorHandler for F
where
    F: FnMut(&ParserError) -> bool,
{
    fn handle_error(&mut self, error: &ParserError) -> bool {
        self(error)
    }
}

/// Error handler that logs through `tracing` and stops only on critical errors
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorHandler;

impl ErrorHandler for TracingErrorHandler {
    fn handle_error(&mut self, error: &ParserError) -> bool {
        match error.severity {
            Severity::Warning => tracing::warn!(code = %error.code, "{}", error),
            Severity::Error | Severity::Critical => {
                tracing::error!(code = %error.code, "{}", error)
            }
        }
        error.severity != Severity::Critical
    }
}

/// Error handler that records every report
#[derive(Debug, Default, Clone)]
pub struct ErrorCollector {
    errors: Vec<ParserError>,
}

impl ErrorCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded reports, in order
    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    /// Reports of one severity
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ParserError> {
        self.errors.iter().filter(move |e| e.severity == severity)
    }

    /// Reports with one code
    pub fn with_code(&self, code: ErrorCode) -> impl Iterator<Item = &ParserError> {
        self.errors.iter().filter(move |e| e.code == code)
    }

    /// Drop all recorded reports
    pub fn clear(&mut self) {
        self.errors.clear();
    }
}

impl ErrorHandler for ErrorCollector {
    fn handle_error(&mut self, error: &ParserError) -> bool {
        self.errors.push(error.clone());
        error.severity != Severity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let missing_file = Error::MissingFile("scene.dae".to_string());
        assert!(missing_file.to_string().contains("[E1003]"));

        let invalid_model = Error::InvalidModel("test error".to_string());
        assert!(invalid_model.to_string().contains("[E3001]"));

        let parse_err = Error::ParseError("test".to_string());
        assert!(parse_err.to_string().contains("[E3002]"));

        let dangling = Error::dangling("instance_geometry", "#missing");
        assert!(dangling.to_string().contains("[E3003]"));
        assert!(dangling.to_string().contains("#missing"));
    }

    #[test]
    fn test_code_matches_message_prefix() {
        let errors = [
            Error::MissingAttribute {
                element: "float_array".into(),
                attribute: "count".into(),
            },
            Error::Cardinality("two meshes".into()),
            Error::DuplicateId("geom".into()),
            Error::WriterFailed("geometry".into()),
        ];
        for err in &errors {
            let prefix = format!("[{}]", err.code());
            assert!(err.to_string().starts_with(&prefix), "{}", err);
        }
    }

    #[test]
    fn test_missing_attribute_helper() {
        let err = Error::missing_attribute("accessor", "source");
        assert!(err.to_string().contains("Element '<accessor>'"));
        assert!(err.to_string().contains("missing required attribute 'source'"));
        assert_eq!(err.code(), ErrorCode::MissingAttribute);
    }

    #[test]
    fn test_parse_error_with_context_helper() {
        let err = Error::parse_error_with_context("float_array value", "abc", "floating-point number");
        assert!(err.to_string().contains("float_array value"));
        assert!(err.to_string().contains("'abc'"));
        assert_eq!(err.code(), ErrorCode::NumericParse);
    }

    #[test]
    fn test_parse_float_error_conversion() {
        let parse_err: std::num::ParseFloatError = "not_a_number".parse::<f64>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(err.to_string().contains("Failed to parse floating-point number"));
        assert!(err.to_string().contains("[E3002]"));
    }

    #[test]
    fn test_error_context_builder() {
        let ctx = ErrorContext::new()
            .file("file:///scene.dae")
            .line(42)
            .column(15)
            .hint("Check attribute syntax");

        assert_eq!(ctx.file, Some("file:///scene.dae".to_string()));
        assert_eq!(ctx.line, Some(42));
        assert_eq!(ctx.column, Some(15));

        let display = ctx.to_string();
        assert!(display.contains("File: file:///scene.dae"));
        assert!(display.contains("Location: line 42, column 15"));
        assert!(display.contains("Hint: Check attribute syntax"));
    }

    #[test]
    fn test_error_context_display_empty() {
        assert_eq!(ErrorContext::new().to_string(), "");
    }

    #[test]
    fn test_parser_error_from_error() {
        let err = Error::missing_attribute("input", "semantic");
        let report = ParserError::new(Severity::Error, &err, ErrorContext::new().line(7).column(3));
        assert_eq!(report.code, ErrorCode::MissingAttribute);
        assert_eq!(report.line(), 7);
        assert_eq!(report.column(), 3);
        assert!(report.to_string().starts_with("error: [E2005]"));
    }

    #[test]
    fn test_collector_continue_policy() {
        let mut collector = ErrorCollector::new();
        let warn = ParserError::new(
            Severity::Warning,
            &Error::InvalidXml("x".into()),
            ErrorContext::new(),
        );
        let fatal = ParserError::new(
            Severity::Critical,
            &Error::InvalidXml("y".into()),
            ErrorContext::new(),
        );
        assert!(collector.handle_error(&warn));
        assert!(!collector.handle_error(&fatal));
        assert_eq!(collector.errors().len(), 2);
        assert_eq!(collector.with_severity(Severity::Critical).count(), 1);
    }

    #[test]
    fn test_closure_handler() {
        let mut seen = 0;
        {
            let mut handler = |e: &ParserError| {
                seen += 1;
                e.severity == Severity::Warning
            };
            let report = ParserError::new(
                Severity::Error,
                &Error::Unsupported("ph".into()),
                ErrorContext::new(),
            );
            assert!(!handler.handle_error(&report));
        }
        assert_eq!(seen, 1);
    }
}
