use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

#[cfg(feature = "backtrace")]
use std::backtrace::Backtrace;

pub type CredenceResult<T> = Result<T, CredenceError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    Io,
    Lex,
    Parse,
    UnknownVariable,
    DimensionMismatch,
    Degenerate,
    MaxIterations,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<Cow<'static, str>>> From<T> for ErrString {
    fn from(v: T) -> Self {
        Self(v.into())
    }
}

/// The error type shared by every credence crate.
///
/// Fatal kinds (`Io`, `Lex`, `Parse`, `UnknownVariable`, `DimensionMismatch`)
/// abort the pipeline with a single diagnostic line. `Degenerate` is
/// recoverable: the offending CPT row is repaired in place and a warning is
/// logged. `MaxIterations` exists so that callers who want to treat an
/// exhausted loopy run as an error can convert the propagation report into
/// one; the engine itself never raises it.
#[derive(Debug)]
pub enum CredenceError {
    Io {
        message: ErrString,
    },
    Lex {
        line: usize,
        message: ErrString,
    },
    Parse {
        line: usize,
        message: ErrString,
    },
    UnknownVariable {
        name: ErrString,
    },
    DimensionMismatch {
        message: ErrString,
    },
    Degenerate {
        message: ErrString,
    },
    MaxIterations {
        iterations: usize,
    },

    Context {
        context: ErrorContext,
        source: Box<CredenceError>,
        #[cfg(feature = "backtrace")]
        backtrace: Backtrace,
    },
}

impl CredenceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::Io,
            Self::Lex { .. } => ErrorCode::Lex,
            Self::Parse { .. } => ErrorCode::Parse,
            Self::UnknownVariable { .. } => ErrorCode::UnknownVariable,
            Self::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            Self::Degenerate { .. } => ErrorCode::Degenerate,
            Self::MaxIterations { .. } => ErrorCode::MaxIterations,
            Self::Context { .. } => ErrorCode::Context,
        }
    }

    /// True for the kinds that abort the pipeline outright.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self.code(),
            ErrorCode::Degenerate | ErrorCode::MaxIterations
        )
    }

    pub fn with_context(self, msg: impl Into<String>) -> Self {
        CredenceError::Context {
            context: ErrorContext::new(msg),
            source: Box::new(self),
            #[cfg(feature = "backtrace")]
            backtrace: Backtrace::capture(),
        }
    }
}

impl Display for CredenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { message } => write!(f, "I/O error: {}", message),
            Self::Lex { line, message } => write!(f, "Lex error at line {}: {}", line, message),
            Self::Parse { line, message } => {
                write!(f, "Parse error at line {}: {}", line, message)
            }
            Self::UnknownVariable { name } => write!(f, "Unknown variable: {}", name),
            Self::DimensionMismatch { message } => {
                write!(f, "Dimension mismatch: {}", message)
            }
            Self::Degenerate { message } => write!(f, "Degenerate distribution: {}", message),
            Self::MaxIterations { iterations } => {
                write!(f, "Hit iteration cap after {} iterations", iterations)
            }
            Self::Context {
                context, source, ..
            } => write!(f, "{}\nCaused by: {}", context, source),
        }
    }
}

impl std::error::Error for CredenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CredenceError {
    fn from(e: std::io::Error) -> Self {
        CredenceError::Io {
            message: e.to_string().into(),
        }
    }
}

#[derive(Debug)]
pub struct ErrorContext {
    message: String,
}
impl ErrorContext {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}
impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
impl std::error::Error for ErrorContext {}

// Ergonomic Result extensions (context)
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> CredenceResult<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> CredenceResult<T>;
}

impl<T, E: Into<CredenceError>> ResultExt<T> for Result<T, E> {
    fn context(self, msg: impl Into<String>) -> CredenceResult<T> {
        self.map_err(|e| e.into().with_context(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> CredenceResult<T> {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[doc(hidden)]
pub mod __private {
    #[inline]
    #[cold]
    #[must_use]
    pub fn must_use<E>(e: E) -> E {
        e
    }
}

#[macro_export]
macro_rules! credence_err {
    (Io: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::CredenceError::Io { message: format!($fmt, $($arg),*).into() })
    };
    (Lex: $line:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::CredenceError::Lex { line: $line, message: format!($fmt, $($arg),*).into() })
    };
    (Parse: $line:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::CredenceError::Parse { line: $line, message: format!($fmt, $($arg),*).into() })
    };
    (UnknownVariable: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::CredenceError::UnknownVariable { name: format!($fmt, $($arg),*).into() })
    };
    (DimensionMismatch: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::CredenceError::DimensionMismatch { message: format!($fmt, $($arg),*).into() })
    };
    (Degenerate: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::CredenceError::Degenerate { message: format!($fmt, $($arg),*).into() })
    };
}

#[macro_export]
macro_rules! credence_bail {
    ($($tt:tt)+) => { return Err($crate::credence_err!($($tt)+)) };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond { $crate::credence_bail!($($tt)+); }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        let err = CredenceError::UnknownVariable {
            name: "dog-out".into(),
        };
        assert_eq!(err.code(), ErrorCode::UnknownVariable);
        assert!(err.is_fatal());

        let err = CredenceError::Degenerate {
            message: "row 2 sums to 0".into(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn context_chains_display() {
        let err: CredenceError = credence_err!(Parse: 4, "expected '{}'", ";");
        let err = err.with_context("while reading dog.bif");
        let text = err.to_string();
        assert!(text.contains("while reading dog.bif"));
        assert!(text.contains("line 4"));
    }

    #[test]
    fn ensure_bails_with_formatted_message() {
        fn check(dim: usize) -> CredenceResult<()> {
            ensure!(dim <= 32, DimensionMismatch: "arity {} exceeds cap", dim);
            Ok(())
        }
        assert!(check(8).is_ok());
        let err = check(64).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DimensionMismatch);
        assert!(err.to_string().contains("64"));
    }
}
