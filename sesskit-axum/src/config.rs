use std::fmt;
use std::time::Duration;

use sesskit::{SessionBuilder, default_builder};

/// `SameSite` cookie attribute values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
            SameSite::None => f.write_str("None"),
        }
    }
}

/// Options for [`session_middleware`](crate::session_middleware).
///
/// `Default` gives the conventional cookie attributes and a 30 minute
/// session lifetime.
#[derive(Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    /// `None` omits the attribute and leaves it to the browser default.
    pub cookie_same_site: Option<SameSite>,
    /// Lifetime of freshly minted sessions; also the cookie max-age.
    pub default_duration: Duration,
    /// Constructor used when minting a fresh session.
    pub builder: SessionBuilder,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "_session_".to_string(),
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: Some(SameSite::Lax),
            default_duration: Duration::from_secs(30 * 60),
            builder: default_builder(),
        }
    }
}
