//! Success classification for one navigation observation.
//!
//! Status codes are unreliable on client-rendered storefronts (the response
//! object can be missing, or the final response after client-side routing is
//! not the one the automation layer sees), so the classifier combines three
//! named rules instead of trusting any single signal:
//!
//! - status rule: status in [200, 400)
//! - DOM rule: rendered text above a minimum, non-empty title, and the final
//!   hostname suffix-matches the target's
//! - host rule: hostname suffix-match alone
//!
//! The default policy is the permissive OR of all three. The earlier, stricter
//! status-and-body heuristic is kept as an alternate policy, and the
//! standalone host rule can be switched off for sites that redirect to error
//! pages on their own host.

use serde::{Deserialize, Serialize};

use crate::types::{Observation, Target, Verdict};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyPolicy {
    /// Any of status / DOM / host rules passes.
    Permissive,
    /// Status rule and body-length check must both pass.
    Strict,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Classifier {
    #[serde(default = "Classifier::default_policy")]
    pub policy: ClassifyPolicy,
    #[serde(default = "Classifier::default_min_text_len")]
    pub min_text_len: usize,
    /// Whether reaching the right host counts as success on its own.
    #[serde(default = "Classifier::default_host_rule_standalone")]
    pub host_rule_standalone: bool,
}

impl Classifier {
    fn default_policy() -> ClassifyPolicy {
        ClassifyPolicy::Permissive
    }

    fn default_min_text_len() -> usize {
        500
    }

    fn default_host_rule_standalone() -> bool {
        true
    }

    /// Pure verdict over one observation. No side effects, no suspension.
    pub fn classify(&self, observation: &Observation, target: &Target) -> Verdict {
        let status_ok = status_rule(observation);
        let host_ok = host_rule(observation, target);
        let dom_ok = self.dom_rule(observation) && host_ok;

        let passed = match self.policy {
            ClassifyPolicy::Permissive => {
                status_ok || dom_ok || (self.host_rule_standalone && host_ok)
            }
            ClassifyPolicy::Strict => status_ok && observation.text_len > self.min_text_len,
        };

        if passed {
            Verdict::pass()
        } else {
            Verdict::fail(format!(
                "unhealthy page: status {}, host '{}' (want '{}'), text {} chars, title '{}'",
                observation.status,
                observation.final_host,
                target.host,
                observation.text_len,
                observation.title
            ))
        }
    }

    fn dom_rule(&self, observation: &Observation) -> bool {
        observation.text_len > self.min_text_len && !observation.title.is_empty()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            policy: Self::default_policy(),
            min_text_len: Self::default_min_text_len(),
            host_rule_standalone: Self::default_host_rule_standalone(),
        }
    }
}

fn status_rule(observation: &Observation) -> bool {
    (200..400).contains(&observation.status)
}

fn host_rule(observation: &Observation, target: &Target) -> bool {
    !target.host.is_empty()
        && !observation.final_host.is_empty()
        && observation.final_host.ends_with(&target.host)
}
