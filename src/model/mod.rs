mod access_token;
mod channel;
mod config;
mod credential;
mod quota;
mod stream;

pub use self::access_token::*;
pub use self::channel::*;
pub use self::config::*;
pub use self::credential::*;
pub use self::quota::*;
pub use self::stream::*;
