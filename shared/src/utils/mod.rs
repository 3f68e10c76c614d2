mod default_utils;
mod time_utils;
mod string_utils;
mod constants;
mod request;
mod hash_utils;

pub use self::default_utils::*;
pub use self::time_utils::*;
pub use self::string_utils::*;
pub use self::constants::*;
pub use self::request::*;
pub use self::hash_utils::*;
