mod api_response;
mod config;
mod messaging;

pub use self::api_response::*;
pub use self::config::*;
pub use self::messaging::*;
