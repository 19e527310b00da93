//! Node identity generation.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// How fresh node identities are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Random UUID v4.
    #[default]
    Uuid,
    /// `prefix` followed by a counter derived from the registry size.
    ///
    /// Deterministic: a runtime restored from a snapshot produces the same
    /// identities as the runtime the snapshot was taken from.
    Sequential,
}

impl std::str::FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uuid" => Ok(IdStrategy::Uuid),
            "sequential" => Ok(IdStrategy::Sequential),
            other => Err(format!("unknown id strategy '{}'", other)),
        }
    }
}

/// Identity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub strategy: IdStrategy,
    /// Prefix for sequential identities.
    pub prefix: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            strategy: IdStrategy::Uuid,
            prefix: "node-".to_string(),
        }
    }
}

impl IdentityConfig {
    /// Generates an identity for which `taken` is false.
    ///
    /// `issued` is the number of identities the runtime has handed out so far.
    pub(crate) fn fresh(&self, issued: usize, taken: impl Fn(&NodeId) -> bool) -> NodeId {
        match self.strategy {
            IdStrategy::Uuid => loop {
                let id = NodeId::new(uuid::Uuid::new_v4().to_string());
                if !taken(&id) {
                    return id;
                }
            },
            IdStrategy::Sequential => {
                let mut n = issued + 1;
                loop {
                    let id = NodeId::new(format!("{}{}", self.prefix, n));
                    if !taken(&id) {
                        return id;
                    }
                    n += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_are_distinct() {
        let config = IdentityConfig::default();
        let mut seen = HashSet::new();
        for i in 0..100 {
            let id = config.fresh(i, |id| seen.contains(id));
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_sequential_skips_taken() {
        let config = IdentityConfig {
            strategy: IdStrategy::Sequential,
            prefix: "n".to_string(),
        };
        assert_eq!(config.fresh(0, |_| false).as_str(), "n1");

        let taken: HashSet<NodeId> = ["n3", "n4"].into_iter().map(NodeId::new).collect();
        assert_eq!(config.fresh(2, |id| taken.contains(id)).as_str(), "n5");
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("UUID".parse::<IdStrategy>().unwrap(), IdStrategy::Uuid);
        assert_eq!(
            "sequential".parse::<IdStrategy>().unwrap(),
            IdStrategy::Sequential
        );
        assert!("random".parse::<IdStrategy>().is_err());
    }
}
