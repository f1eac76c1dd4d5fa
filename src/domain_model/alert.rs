use crate::domain_model::SubjectId;
use std::net::IpAddr;

/// Raised when a refresh arrives from a different IP than the one the
/// consumed record was bound to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionAlert {
    pub subject: SubjectId,
    pub previous_ip: IpAddr,
    pub current_ip: IpAddr,
}

impl SessionAlert {
    pub fn title(&self) -> &'static str {
        "Warning: IP address changed"
    }

    pub fn body(&self) -> String {
        format!(
            "Your session IP changed from {} to {}",
            self.previous_ip, self.current_ip
        )
    }
}
