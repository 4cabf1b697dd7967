use std::fmt;
use std::io;

use amfwire_codec::AmfError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn amf_error(context: &str, err: AmfError) -> CliError {
    match err {
        AmfError::Io(source) => io_error(context, source),
        AmfError::MissingSource => CliError::new(USAGE, format!("{context}: {err}")),
        AmfError::IncompleteData
        | AmfError::InvalidMarker(_)
        | AmfError::UnsupportedType(_)
        | AmfError::InvalidReference { .. }
        | AmfError::InvalidUtf8(_)
        | AmfError::NotExternalizable(_)
        | AmfError::DepthLimitExceeded { .. }
        | AmfError::LengthOverflow { .. }
        | AmfError::MessageTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        AmfError::ConnectionClosed { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_is_data_invalid() {
        let err = amf_error("decode failed", AmfError::InvalidMarker(0x42));
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(err.message, "decode failed: invalid type marker 0x42");
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err = amf_error(
            "read failed",
            AmfError::Io(io::Error::from(io::ErrorKind::PermissionDenied)),
        );
        assert_eq!(err.code, PERMISSION_DENIED);

        let err = io_error("open failed", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn graph_errors_are_internal() {
        let err = amf_error("encode failed", AmfError::UnknownNode(7));
        assert_eq!(err.code, INTERNAL);
    }
}
