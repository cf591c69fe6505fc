//! Policy evaluation.
//!
//! # Responsibilities
//! - Compile configuration into an ordered rule list
//! - Evaluate rules first-match-wins before any routing work
//!
//! The blocklist rule is ordered before the HTTPS upgrade rule on purpose:
//! a blocked client must never receive a redirect or reach a backend.

use std::net::IpAddr;

use axum::http::Uri;

use crate::config::PolicyConfig;
use crate::policy::rules::{InsecureScheme, IpBlocklist, Predicate};

/// Ephemeral per-request view consumed by policy evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Client IP, resolved from the trusted forwarded-for header or the
    /// peer address.
    pub client_ip: IpAddr,
    /// Original scheme as reported by the terminating edge layer.
    pub scheme: &'a str,
    /// Host header, if present.
    pub host: Option<&'a str>,
    /// Request URI.
    pub uri: &'a Uri,
}

impl RequestContext<'_> {
    /// Path plus query string, as received.
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }
}

/// Outcome of policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Continue to routing.
    Allow,
    /// Reject with 403.
    Deny { reason: &'static str },
    /// Permanent redirect to `location`.
    Redirect { location: String },
}

/// What a matched rule does to the request.
#[derive(Debug, Clone, Copy)]
enum Action {
    Deny(&'static str),
    UpgradeToHttps,
}

#[derive(Debug)]
struct Rule {
    predicate: Box<dyn Predicate>,
    action: Action,
}

/// Ordered first-match-wins rule evaluation.
#[derive(Debug)]
pub struct PolicyEngine {
    rules: Vec<Rule>,
}

impl PolicyEngine {
    /// Compile the policy section of the configuration.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let mut rules = Vec::new();

        let blocklist = IpBlocklist::new(config.blocked_ips.iter().copied());
        if !blocklist.is_empty() {
            rules.push(Rule {
                predicate: Box::new(blocklist),
                action: Action::Deny("blocked"),
            });
        }

        if config.enforce_https {
            rules.push(Rule {
                predicate: Box::new(InsecureScheme),
                action: Action::UpgradeToHttps,
            });
        }

        Self { rules }
    }

    /// Evaluate the rules against a request context.
    pub fn evaluate(&self, ctx: &RequestContext<'_>) -> Decision {
        for rule in &self.rules {
            if !rule.predicate.matches(ctx) {
                continue;
            }
            match rule.action {
                Action::Deny(reason) => return Decision::Deny { reason },
                Action::UpgradeToHttps => {
                    if let Some(host) = ctx.host {
                        return Decision::Redirect {
                            location: format!("https://{}{}", host, ctx.path_and_query()),
                        };
                    }
                    // Without a host there is nowhere to redirect to.
                    tracing::debug!("insecure request without a host header, cannot upgrade");
                }
            }
        }
        Decision::Allow
    }
}
