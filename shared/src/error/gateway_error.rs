use std::error::Error;
use std::fmt::{Display, Formatter, Result};
use crate::utils::sanitize_sensitive_info;

#[macro_export]
macro_rules! notify_err {
    ($($arg:tt)*) => {
        $crate::error::GatewayError::new($crate::error::GatewayErrorKind::Notify, format!($($arg)*))
    };
}

pub use notify_err;

#[macro_export]
macro_rules! info_err {
    // forwards format args and wraps the message into an Info error
    ($($arg:tt)*) => {
        $crate::error::GatewayError::new($crate::error::GatewayErrorKind::Info, format!($($arg)*))
    };
}

pub use info_err;

#[macro_export]
macro_rules! info_err_res {
    ($($arg:tt)*) => {
        Err($crate::error::GatewayError::new($crate::error::GatewayErrorKind::Info, format!($($arg)*)))
    };
}

pub use info_err_res;

#[macro_export]
macro_rules! handle_gateway_error_result_list {
    ($kind:expr, $result: expr) => {
        let errors = $result
            .filter_map(|result| {
                if let Err(err) = result {
                    Some(err.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<String>>();
        if !&errors.is_empty() {
            return Err($crate::error::GatewayError::new($kind, errors.join("\n")));
        }
    }
}

pub use handle_gateway_error_result_list;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GatewayErrorKind {
    // only logged
    Info,
    // logged and forwarded to the notifier
    Notify,
}

#[derive(Debug)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub const fn new(kind: GatewayErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "Gateway error: {}", self.message)
    }
}

impl Error for GatewayError {}

pub fn to_io_error<E>(err: E) -> std::io::Error
where
    E: std::error::Error,
{ std::io::Error::other(sanitize_sensitive_info(&err.to_string())) }
