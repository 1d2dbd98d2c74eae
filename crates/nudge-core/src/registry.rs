//! The campaign registry: an arena of validated campaigns in declaration order.
//!
//! The registry is built once and never mutated. Expiry, locale filtering and
//! "already viewed" suppression all produce views over it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
  Error,
  campaign::{Campaign, CampaignSpec},
};

#[derive(Debug, Clone, Default)]
pub struct Registry {
  campaigns: Vec<Campaign>,
  index:     HashMap<String, usize>,
}

impl Registry {
  /// Validate configuration and keep what survives.
  ///
  /// Invalid campaigns and later duplicates are dropped with a warning.
  pub fn load(specs: impl IntoIterator<Item = CampaignSpec>) -> Self {
    let mut registry = Self::default();
    for spec in specs {
      let campaign = match spec.validate() {
        Ok(c) => c,
        Err(e) => {
          tracing::warn!(error = %e, "dropping campaign");
          continue;
        }
      };
      if registry.index.contains_key(&campaign.id) {
        let e = Error::DuplicateCampaign(campaign.id);
        tracing::warn!(error = %e, "dropping campaign");
        continue;
      }
      registry
        .index
        .insert(campaign.id.clone(), registry.campaigns.len());
      registry.campaigns.push(campaign);
    }
    registry
  }

  /// Campaigns whose window contains `now`, in declaration order.
  pub fn list_active(
    &self,
    now: DateTime<Utc>,
  ) -> impl Iterator<Item = &Campaign> + '_ {
    self.campaigns.iter().filter(move |c| c.is_active_at(now))
  }

  pub fn get(&self, id: &str) -> Option<&Campaign> {
    self.index.get(id).map(|&i| &self.campaigns[i])
  }

  pub fn iter(&self) -> impl Iterator<Item = &Campaign> + '_ {
    self.campaigns.iter()
  }

  pub fn len(&self) -> usize { self.campaigns.len() }

  pub fn is_empty(&self) -> bool { self.campaigns.is_empty() }
}
