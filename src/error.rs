use failure::{Backtrace, Context, Fail};
use std::fmt;
use std::io;

/// Error type for the KVS job-processing crate.
#[derive(Debug)]
pub struct KvsError {
    inner: Context<KvsErrorKind>,
}

/// Kinds of errors that can occur while operating the store, the
/// interpreter, the snapshot manager, or the job/worker-pool layer above
/// them.
#[derive(Debug, Clone, Fail)]
pub enum KvsErrorKind {
    /// The key's first byte does not hash to a valid bucket index.
    #[fail(display = "invalid key: {}", _0)]
    InvalidKey(String),
    /// A command's operand list could not be parsed.
    #[fail(display = "parse error: {}", _0)]
    ParseError(String),
    /// A filesystem operation (job file, output file, backup file) failed.
    #[fail(display = "io error")]
    IoError,
    /// Allocation or thread-creation failure.
    #[fail(display = "resource exhausted: {}", _0)]
    ResourceExhaustion(String),
    /// Invalid CLI arguments.
    #[fail(display = "invalid configuration: {}", _0)]
    ConfigError(String),
    /// A thread pool worker panicked while running a task.
    #[fail(display = "thread pool worker panicked")]
    ThreadPanic,
}

impl KvsError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> &KvsErrorKind {
        self.inner.get_context()
    }
}

impl Fail for KvsError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl fmt::Display for KvsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl From<KvsErrorKind> for KvsError {
    fn from(kind: KvsErrorKind) -> KvsError {
        KvsError {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<KvsErrorKind>> for KvsError {
    fn from(context: Context<KvsErrorKind>) -> KvsError {
        KvsError { inner: context }
    }
}

impl From<io::Error> for KvsError {
    fn from(error: io::Error) -> KvsError {
        error.context(KvsErrorKind::IoError).into()
    }
}
