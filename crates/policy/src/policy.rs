//! Policy configuration and enforcement.

use crate::{Error, Result, SourceKind, SourceRequest};
use serde::{Deserialize, Serialize};

/// Packages whose notifications are captured when no policy is configured.
pub const DEFAULT_PACKAGES: &[&str] = &["com.kakao.talk", "com.kakao.talk.plus"];

/// Policy configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Origins that are explicitly allowed.
    #[serde(default)]
    pub allow: AllowRules,

    /// Origins that are explicitly denied (overrides allow).
    #[serde(default)]
    pub deny: DenyRules,
}

/// Rules for allowed origins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowRules {
    /// Notification packages whose notifications are captured.
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,

    /// SMS senders to capture. Empty means any sender.
    #[serde(default)]
    pub senders: Vec<String>,
}

impl Default for AllowRules {
    fn default() -> Self {
        Self {
            packages: default_packages(),
            senders: Vec::new(),
        }
    }
}

/// Rules for denied origins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DenyRules {
    /// SMS senders that are never captured.
    #[serde(default)]
    pub senders: Vec<String>,
}

/// Result of a source check.
#[derive(Debug, Clone)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn default_packages() -> Vec<String> {
    DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect()
}

impl Policy {
    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Allow notifications from exactly the given packages, any SMS sender.
    pub fn packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: AllowRules {
                packages: packages.into_iter().map(Into::into).collect(),
                senders: Vec::new(),
            },
            deny: DenyRules::default(),
        }
    }

    /// Check if events from an origin may be captured.
    pub fn check(&self, request: &SourceRequest) -> Decision {
        match request.kind {
            SourceKind::Notification => {
                if matches_any(&self.allow.packages, &request.origin) {
                    Decision::Allow
                } else {
                    Decision::Deny {
                        reason: format!("package {} not in allowlist", request.origin),
                    }
                }
            }
            SourceKind::Sms => {
                let sender = normalize_sender(&request.origin);
                let listed = |rules: &[String]| {
                    rules
                        .iter()
                        .any(|r| r == "*" || normalize_sender(r) == sender)
                };

                if listed(&self.deny.senders) {
                    return Decision::Deny {
                        reason: format!("sender {} is denied by policy", request.origin),
                    };
                }
                if self.allow.senders.is_empty() || listed(&self.allow.senders) {
                    Decision::Allow
                } else {
                    Decision::Deny {
                        reason: format!("sender {} not in allowlist", request.origin),
                    }
                }
            }
        }
    }
}

fn matches_any(allowlist: &[String], origin: &str) -> bool {
    allowlist.iter().any(|a| a == "*" || a == origin)
}

/// Strip formatting characters so "010-1234-5678" and "01012345678" compare equal.
fn normalize_sender(sender: &str) -> String {
    sender
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}
