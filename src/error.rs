use std::fmt;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Browser automation errors
    Browser(BrowserError),
    /// Captcha-recognition service errors
    Captcha(CaptchaError),
    /// Persistence collaborator errors
    Store(StoreError),
    /// Scraped-data parsing errors
    Data(DataError),
    /// File / config loading errors
    File(FileError),
    /// Anything else (wraps third-party errors without a better home)
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "browser error: {}", e),
            AppError::Captcha(e) => write!(f, "captcha service error: {}", e),
            AppError::Store(e) => write!(f, "store error: {}", e),
            AppError::Data(e) => write!(f, "data error: {}", e),
            AppError::File(e) => write!(f, "file error: {}", e),
            AppError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Captcha(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::Data(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// Browser automation errors
#[derive(Debug)]
pub enum BrowserError {
    /// Headless config rejected before launch
    ConfigurationFailed { detail: String },
    /// Could not start the browser process
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Page load failed
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// evaluate() / CDP command failed
    ScriptFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// An element did not appear within its bounded wait
    ElementWaitTimedOut { selector: String, waited_ms: u64 },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConfigurationFailed { detail } => {
                write!(f, "headless configuration failed: {}", detail)
            }
            BrowserError::LaunchFailed { source } => {
                write!(f, "failed to launch browser: {}", source)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "navigation to {} failed: {}", url, source)
            }
            BrowserError::ScriptFailed { source } => {
                write!(f, "script execution failed: {}", source)
            }
            BrowserError::ElementWaitTimedOut { selector, waited_ms } => {
                write!(
                    f,
                    "element '{}' did not appear within {}ms",
                    selector, waited_ms
                )
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Captcha-recognition service errors
#[derive(Debug)]
pub enum CaptchaError {
    /// Credentials not configured
    CredentialsMissing,
    /// HTTP request failed or timed out
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Non-success HTTP status
    BadStatus { endpoint: String, status: u16 },
    /// Response body had no usable `result` field
    MissingResult { endpoint: String },
}

impl fmt::Display for CaptchaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptchaError::CredentialsMissing => {
                write!(f, "captcha API key or user id not configured")
            }
            CaptchaError::RequestFailed { endpoint, source } => {
                write!(f, "request to {} failed: {}", endpoint, source)
            }
            CaptchaError::BadStatus { endpoint, status } => {
                write!(f, "{} returned HTTP {}", endpoint, status)
            }
            CaptchaError::MissingResult { endpoint } => {
                write!(f, "{} returned no recognition result", endpoint)
            }
        }
    }
}

impl std::error::Error for CaptchaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptchaError::RequestFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Persistence collaborator errors
#[derive(Debug)]
pub enum StoreError {
    MissingSection { id: i64 },
    MissingSemester { id: i64 },
    MissingStudent { id: i64 },
    /// Backend-specific failure (connection loss, write rejection, ...)
    Backend { detail: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::MissingSection { id } => write!(f, "section {} not found", id),
            StoreError::MissingSemester { id } => write!(f, "semester {} not found", id),
            StoreError::MissingStudent { id } => write!(f, "student {} not found", id),
            StoreError::Backend { detail } => write!(f, "backend failure: {}", detail),
        }
    }
}

impl std::error::Error for StoreError {}

/// Scraped-data parsing errors
#[derive(Debug)]
pub enum DataError {
    /// The result grid was missing or not in the expected shape
    MalformedSheet { detail: String },
    /// A cell failed to parse into its typed field
    FieldParse { field: &'static str, value: String },
    /// JSON (de)serialization failed
    JsonParse {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::MalformedSheet { detail } => write!(f, "malformed mark sheet: {}", detail),
            DataError::FieldParse { field, value } => {
                write!(f, "could not parse {} from {:?}", field, value)
            }
            DataError::JsonParse { source } => write!(f, "JSON parse failed: {}", source),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::JsonParse { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// File / config loading errors
#[derive(Debug)]
pub enum FileError {
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "failed to parse {}: {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. } | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

// ========== conversions from common error types ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Data(DataError::JsonParse {
            source: Box::new(err),
        })
    }
}

// ========== convenience constructors ==========

impl AppError {
    pub fn launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    pub fn element_wait_timed_out(selector: impl Into<String>, waited_ms: u64) -> Self {
        AppError::Browser(BrowserError::ElementWaitTimedOut {
            selector: selector.into(),
            waited_ms,
        })
    }

    pub fn captcha_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Captcha(CaptchaError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    pub fn malformed_sheet(detail: impl Into<String>) -> Self {
        AppError::Data(DataError::MalformedSheet {
            detail: detail.into(),
        })
    }

    pub fn field_parse(field: &'static str, value: impl Into<String>) -> Self {
        AppError::Data(DataError::FieldParse {
            field,
            value: value.into(),
        })
    }

    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    pub fn toml_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result type alias ==========

/// Application result type
pub type AppResult<T> = Result<T, AppError>;
