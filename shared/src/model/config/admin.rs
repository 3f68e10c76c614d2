use crate::error::{info_err, GatewayError};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfigDto {
    /// Bearer token for the credential api.
    pub token: String,
}

impl AdminConfigDto {
    pub fn prepare(&mut self) -> Result<(), GatewayError> {
        self.token = self.token.trim().to_string();
        if self.token.len() < 16 {
            return Err(info_err!("admin.token must have at least 16 characters"));
        }
        Ok(())
    }
}
