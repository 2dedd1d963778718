mod kadm5_error;

pub type ErrorCode = i32;

/// A com_err style status: the code travels on the wire, the message is
/// only ever used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    pub code: ErrorCode,
    pub message: &'static str,
}

impl Error {
    pub const fn new(code: ErrorCode, message: &'static str) -> Self {
        Self { code, message }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

macro_rules! error {
    ($error:ident, $code:expr, $message:expr) => {
        pub const $error: Error = Error::new($code, $message);
    };
}

pub(self) use error;
