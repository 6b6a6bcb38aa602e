//! The result of a pattern detection.

use crate::dataset::Dataset;
use crate::entities::{Profile, Signature};
use crate::error::Result;
use crate::values::Values;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fallback tier that produced a match, from most to least confident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// No fragment combination resembled a known signature.
    None,
    /// The decomposed input equals a signature.
    Exact,
    /// Equal to a signature once version-like numbers are ignored.
    Numeric,
    /// A unique signature at the smallest node distance.
    Nearest,
    /// Best of several signatures tied at the smallest node distance.
    Closest,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::None => "none",
            MatchMethod::Exact => "exact",
            MatchMethod::Numeric => "numeric",
            MatchMethod::Nearest => "nearest",
            MatchMethod::Closest => "closest",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work done to find a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCost {
    /// Distance from the input to the chosen signature: summed numeric drift
    /// for numeric matches, node distance for nearest and closest.
    pub difference: u64,
    pub signatures_compared: u64,
    pub nodes_evaluated: u64,
}

/// A detected profile set, answering property lookups on demand.
#[derive(Debug, Clone)]
pub struct Match {
    dataset: Arc<Dataset>,
    user_agent: String,
    method: MatchMethod,
    signature: Option<Arc<Signature>>,
    profiles: Vec<Arc<Profile>>,
    cost: MatchCost,
    elapsed: Duration,
}

/// Serializable overview of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub user_agent: String,
    pub method: MatchMethod,
    pub device_id: String,
    pub signature: Option<u32>,
    pub profile_ids: Vec<u32>,
    pub difference: u64,
    pub signatures_compared: u64,
    pub nodes_evaluated: u64,
    pub elapsed_micros: u64,
}

impl Match {
    pub(crate) fn new(
        dataset: Arc<Dataset>,
        user_agent: &str,
        method: MatchMethod,
        signature: Option<Arc<Signature>>,
        mut profiles: Vec<Arc<Profile>>,
        cost: MatchCost,
        elapsed: Duration,
    ) -> Self {
        profiles.sort_by_key(|profile| profile.component_index);
        Self {
            dataset,
            user_agent: user_agent.to_string(),
            method,
            signature,
            profiles,
            cost,
            elapsed,
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn method(&self) -> MatchMethod {
        self.method
    }

    /// The signature chosen, absent for [`MatchMethod::None`].
    pub fn signature(&self) -> Option<&Arc<Signature>> {
        self.signature.as_ref()
    }

    /// One profile per component, in component order.
    pub fn profiles(&self) -> &[Arc<Profile>] {
        &self.profiles
    }

    pub fn cost(&self) -> MatchCost {
        self.cost
    }

    pub fn difference(&self) -> u64 {
        self.cost.difference
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn profile_ids(&self) -> Vec<u32> {
        self.profiles.iter().map(|p| p.profile_id).collect()
    }

    /// Profile ids joined with `-`, identifying the device combination.
    pub fn device_id(&self) -> String {
        self.profiles
            .iter()
            .map(|p| p.profile_id.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Values of property `name`.
    ///
    /// `Ok(None)` when the property is unknown, or when the matched profile
    /// selects nothing for it and it has no default.
    pub fn values(&self, name: &str) -> Result<Option<Values>> {
        let Some(property) = self.dataset.property_by_name(name) else {
            return Ok(None);
        };

        let selected = match self
            .profiles
            .iter()
            .find(|profile| profile.component_index == property.component_index)
        {
            Some(profile) => self.dataset.property_values(profile, property)?,
            None => Vec::new(),
        };
        if !selected.is_empty() {
            return Ok(Some(Values::new(
                &property.name,
                property.value_type,
                selected,
                false,
            )));
        }

        match property.default_value {
            Some(default) => Ok(Some(Values::new(
                &property.name,
                property.value_type,
                vec![self.dataset.value(default)?],
                true,
            ))),
            None => Ok(None),
        }
    }

    /// Substitute the profile with external id `profile_id` for the current
    /// profile of the same component.
    ///
    /// Returns `false`, leaving the match untouched, when no profile has
    /// that id.
    pub fn update_profile(&mut self, profile_id: u32) -> Result<bool> {
        let Some(replacement) = self.dataset.profile_by_id(profile_id)? else {
            debug!(profile_id, "Ignoring override for unknown profile");
            return Ok(false);
        };

        match self
            .profiles
            .iter_mut()
            .find(|profile| profile.component_index == replacement.component_index)
        {
            Some(slot) => *slot = replacement,
            None => {
                self.profiles.push(replacement);
                self.profiles.sort_by_key(|profile| profile.component_index);
            }
        }
        Ok(true)
    }

    /// Apply each id with [`Match::update_profile`], skipping unknown ids.
    /// Returns how many were applied.
    pub fn apply_profile_overrides(&mut self, profile_ids: &[u32]) -> Result<usize> {
        let mut applied = 0;
        for &profile_id in profile_ids {
            if self.update_profile(profile_id)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            user_agent: self.user_agent.clone(),
            method: self.method,
            device_id: self.device_id(),
            signature: self.signature.as_ref().map(|s| s.index),
            profile_ids: self.profile_ids(),
            difference: self.cost.difference,
            signatures_compared: self.cost.signatures_compared,
            nodes_evaluated: self.cost.nodes_evaluated,
            elapsed_micros: self.elapsed.as_micros() as u64,
        }
    }
}
