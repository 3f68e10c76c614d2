use super::macros;
use shared::model::PersistenceConfigDto;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub snapshot_interval: Duration,
}

macros::from_impl!(PersistenceConfig);
impl From<&PersistenceConfigDto> for PersistenceConfig {
    fn from(dto: &PersistenceConfigDto) -> Self {
        Self {
            snapshot_interval: Duration::from_secs(dto.snapshot_interval_secs.max(1)),
        }
    }
}
