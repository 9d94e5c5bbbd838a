//! Performance counter metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Aggregation applied by the server when rolling samples up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RollupType {
    Average,
    Minimum,
    Maximum,
    Latest,
    Summation,
    None,
    /// Any rollup name this client does not know about.
    Unknown(String),
}

impl RollupType {
    pub fn as_str(&self) -> &str {
        match self {
            RollupType::Average => "average",
            RollupType::Minimum => "minimum",
            RollupType::Maximum => "maximum",
            RollupType::Latest => "latest",
            RollupType::Summation => "summation",
            RollupType::None => "none",
            RollupType::Unknown(s) => s,
        }
    }
}

impl From<String> for RollupType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "average" => RollupType::Average,
            "minimum" => RollupType::Minimum,
            "maximum" => RollupType::Maximum,
            "latest" => RollupType::Latest,
            "summation" => RollupType::Summation,
            "none" => RollupType::None,
            _ => RollupType::Unknown(s),
        }
    }
}

impl From<RollupType> for String {
    fn from(r: RollupType) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for RollupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of one performance counter as reported by the perf manager.
///
/// Identity is `id`; two descriptors with the same id describe the same counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDescriptor {
    pub id: i32,
    /// Counter group, e.g. `cpu`, `mem`, `disk`.
    pub group_key: String,
    /// Counter name within the group, e.g. `usage`.
    #[serde(default)]
    pub name_key: String,
    /// Human readable description shown in prompts and sample output.
    pub summary: String,
    #[serde(default)]
    pub unit_key: String,
    pub rollup_type: RollupType,
}

impl CounterDescriptor {
    /// Dotted `group.name.rollup` form used in logs.
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.group_key, self.name_key, self.rollup_type)
    }
}
