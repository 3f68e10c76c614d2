mod channel_catalog;
mod m3u;

pub use self::channel_catalog::*;
pub use self::m3u::*;
