mod concurrency_limiter;
mod gateway;
mod group_membership;
mod quota_engine;

pub use self::concurrency_limiter::*;
pub use self::gateway::*;
pub use self::group_membership::*;
pub use self::quota_engine::*;
