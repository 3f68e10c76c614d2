mod admin;
mod api;
mod catalog;
mod concurrency;
mod config_dto;
mod credential;
mod group_check;
mod log;
mod messaging;
mod persistence;
mod quota;
mod rate_limit;
mod token;

pub use self::admin::*;
pub use self::api::*;
pub use self::catalog::*;
pub use self::concurrency::*;
pub use self::config_dto::*;
pub use self::credential::*;
pub use self::group_check::*;
pub use self::log::*;
pub use self::messaging::*;
pub use self::persistence::*;
pub use self::quota::*;
pub use self::rate_limit::*;
pub use self::token::*;
