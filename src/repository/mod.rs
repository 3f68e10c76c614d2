mod state_store;
mod storage_const;
mod tracked_map;

pub use self::state_store::*;
pub use self::tracked_map::*;
