use std::fmt;
use std::str::FromStr;
use crate::info_err_res;
use crate::error::GatewayError;

#[derive(Debug, Copy, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
pub enum MsgKind {
    #[serde(rename = "quota_exceeded")]
    QuotaExceeded,
    #[serde(rename = "permanent_promotion")]
    PermanentPromotion,
    #[serde(rename = "credential_expiring")]
    CredentialExpiring,
    #[serde(rename = "error")]
    Error,
}

impl fmt::Display for MsgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MsgKind::QuotaExceeded => "QuotaExceeded",
            MsgKind::PermanentPromotion => "PermanentPromotion",
            MsgKind::CredentialExpiring => "CredentialExpiring",
            MsgKind::Error => "Error",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MsgKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, GatewayError> {
        if s.eq_ignore_ascii_case("quota_exceeded") {
            Ok(Self::QuotaExceeded)
        } else if s.eq_ignore_ascii_case("permanent_promotion") {
            Ok(Self::PermanentPromotion)
        } else if s.eq_ignore_ascii_case("credential_expiring") {
            Ok(Self::CredentialExpiring)
        } else if s.eq_ignore_ascii_case("error") {
            Ok(Self::Error)
        } else {
            info_err_res!("Unknown MsgKind: {}", s)
        }
    }
}
