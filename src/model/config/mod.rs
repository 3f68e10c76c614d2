mod macros;
mod base;
mod token;
mod quota;
mod concurrency;
mod persistence;
mod catalog;
mod credential_policy;

pub use self::base::*;
pub use self::token::*;
pub use self::quota::*;
pub use self::concurrency::*;
pub use self::persistence::*;
pub use self::catalog::*;
pub use self::credential_policy::*;
