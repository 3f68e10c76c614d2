mod clock;
mod config_reader;
mod logging;
mod sys_utils;
pub mod crypto_utils;
pub mod request;
pub mod telegram;

pub use self::clock::*;
pub use self::config_reader::*;
pub use self::logging::*;
pub use self::sys_utils::*;

#[macro_export]
macro_rules! debug_if_enabled {
    ($fmt:expr, $( $args:expr ),*) => {
        if log::log_enabled!(log::Level::Debug) {
            log::log!(log::Level::Debug, $fmt, $($args),*);
        }
    };

    ($txt:expr) => {
        if log::log_enabled!(log::Level::Debug) {
            log::log!(log::Level::Debug, $txt);
        }
    };
}

pub use debug_if_enabled;
