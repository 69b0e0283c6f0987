/// Location matchers and metric label resolution
use std::collections::HashMap;

use crate::models::{LabelTuple, Observation};

/// Which observation field a matcher compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Id,
    Channel,
}

/// A configured `(model, value) -> location` assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMatcher {
    pub kind: MatcherKind,
    pub model: String,
    pub value: String,
    pub location: String,
}

/// `(model, value) -> location`, nested by model so lookups borrow their keys
#[derive(Debug, Clone, Default)]
struct MatcherMap {
    by_model: HashMap<String, HashMap<String, String>>,
}

impl MatcherMap {
    fn insert(&mut self, model: String, value: String, location: String) {
        self.by_model
            .entry(model)
            .or_default()
            .insert(value, location);
    }

    fn get(&self, model: &str, value: &str) -> Option<&str> {
        self.by_model
            .get(model)
            .and_then(|values| values.get(value))
            .map(String::as_str)
    }

    fn len(&self) -> usize {
        self.by_model.values().map(HashMap::len).sum()
    }
}

/// Static location lookup, built once at startup and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    by_id: MatcherMap,
    by_channel: MatcherMap,
}

impl LocationTable {
    /// Build the table from configured matchers. Later duplicates replace earlier ones.
    pub fn new<I>(matchers: I) -> Self
    where
        I: IntoIterator<Item = LocationMatcher>,
    {
        let mut table = LocationTable::default();
        for matcher in matchers {
            let map = match matcher.kind {
                MatcherKind::Id => &mut table.by_id,
                MatcherKind::Channel => &mut table.by_channel,
            };
            map.insert(matcher.model, matcher.value, matcher.location);
        }
        table
    }

    pub fn id_matcher_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn channel_matcher_count(&self) -> usize {
        self.by_channel.len()
    }

    /// Location for an observation: id matcher first, then channel matcher,
    /// otherwise the empty string.
    pub fn location_for(&self, observation: &Observation) -> &str {
        self.by_id
            .get(&observation.model, &observation.id)
            .or_else(|| self.by_channel.get(&observation.model, &observation.channel))
            .unwrap_or("")
    }

    /// Label set an observation's metrics are recorded under
    pub fn resolve_labels(&self, observation: &Observation) -> LabelTuple {
        LabelTuple {
            model: observation.model.clone(),
            id: observation.id.clone(),
            channel: observation.channel.clone(),
            location: self.location_for(observation).to_string(),
        }
    }
}
