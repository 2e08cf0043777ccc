//! Planning configuration: agents, per-action costs, per-subassembly
//! reachability.
//!
//! All maps are keyed by name and ordered, so iteration is deterministic,
//! in particular the roster order the combinator's canonical agent order
//! depends on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TandemError};

/// An agent that can perform assembly actions: a human or a robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Agent name, unique within the roster.
    pub name: String,
    /// Hostname the agent is reachable at.
    pub host: String,
    /// Port the agent listens on.
    pub port: String,
}

/// Per-agent costs of one action.
///
/// A cost of `f64::INFINITY` marks the (action, agent) pairing as
/// unassignable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Action name.
    pub name: String,
    /// Execution cost keyed by agent name.
    pub costs: BTreeMap<String, f64>,
}

/// Whether one agent can act on one subassembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reach {
    /// True when the agent can act on the subassembly directly.
    pub reachable: bool,
    /// Name of the interaction action that establishes reachability when
    /// `reachable` is false.
    pub interaction: Option<String>,
}

impl Reach {
    /// A directly reachable entry.
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            interaction: None,
        }
    }

    /// An unreachable entry requiring the named interaction first.
    pub fn via(interaction: impl Into<String>) -> Self {
        Self {
            reachable: false,
            interaction: Some(interaction.into()),
        }
    }
}

/// Per-agent reachability of one subassembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubassemblySpec {
    /// Subassembly name.
    pub name: String,
    /// Reachability keyed by agent name.
    pub reachability: BTreeMap<String, Reach>,
}

/// The full planning configuration parsed alongside the assembly graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Agent roster keyed by name.
    pub agents: BTreeMap<String, Agent>,
    /// Action cost tables keyed by action name. Includes interaction
    /// actions registered from reachability entries.
    pub actions: BTreeMap<String, ActionSpec>,
    /// Subassembly reachability tables keyed by subassembly name.
    pub subassemblies: BTreeMap<String, SubassemblySpec>,
}

impl Configuration {
    /// Agent names in roster order.
    pub fn agent_names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Cost of `action` when performed by `agent`, if both are known.
    pub fn cost_of(&self, action: &str, agent: &str) -> Option<f64> {
        self.actions.get(action)?.costs.get(agent).copied()
    }

    /// Reachability of `subassembly` for `agent`, if both are known.
    pub fn reach_of(&self, subassembly: &str, agent: &str) -> Option<&Reach> {
        self.subassemblies.get(subassembly)?.reachability.get(agent)
    }

    /// Check the completeness invariants: a non-empty roster, a cost entry
    /// for every (action, agent) pair, and a reachability entry for every
    /// (subassembly, agent) pair.
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(TandemError::EmptyRoster);
        }
        for subassembly in self.subassemblies.values() {
            for agent in self.agents.keys() {
                if !subassembly.reachability.contains_key(agent) {
                    return Err(TandemError::MissingReach {
                        subassembly: subassembly.name.clone(),
                        agent: agent.clone(),
                    });
                }
            }
        }
        for action in self.actions.values() {
            for agent in self.agents.keys() {
                if !action.costs.contains_key(agent) {
                    return Err(TandemError::MissingCost {
                        action: action.name.clone(),
                        agent: agent.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
