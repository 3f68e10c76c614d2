use axum::http::StatusCode;

mod credential_manager;
mod fingerprint;
mod password;
mod token_codec;
type Rejection = (StatusCode, &'static str);

pub use self::credential_manager::*;
pub use self::fingerprint::*;
pub use self::password::*;
pub use self::token_codec::*;
