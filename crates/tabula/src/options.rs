//! Engine configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tabula_formula::{DEFAULT_CAPACITY, DEFAULT_TTL};

/// How far a cascade reaches from the saved cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CascadePolicy {
    /// Only formulas that read the saved column directly
    OneHop,
    /// Every formula downstream of the saved column, in dependency order
    #[default]
    Transitive,
}

impl CascadePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadePolicy::OneHop => "one-hop",
            CascadePolicy::Transitive => "transitive",
        }
    }
}

impl fmt::Display for CascadePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CascadePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "one-hop" | "onehop" | "one_hop" => Ok(CascadePolicy::OneHop),
            "transitive" => Ok(CascadePolicy::Transitive),
            other => Err(format!("unknown cascade policy: {}", other)),
        }
    }
}

/// Options for the [`Engine`](crate::Engine)
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Lifetime of cached computed values (default: one hour)
    pub cache_ttl: Duration,
    /// Maximum number of cached computed values
    pub cache_capacity: usize,
    /// Cascade reach after a cell is saved (default: transitive)
    pub cascade_policy: CascadePolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            cache_capacity: DEFAULT_CAPACITY,
            cascade_policy: CascadePolicy::default(),
        }
    }
}

/// Options for bulk import
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Reject the whole import on a non-numeric value in a number column
    /// instead of storing it as empty
    pub strict_numeric: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!("one-hop".parse::<CascadePolicy>(), Ok(CascadePolicy::OneHop));
        assert_eq!("Transitive".parse::<CascadePolicy>(), Ok(CascadePolicy::Transitive));
        assert!("sideways".parse::<CascadePolicy>().is_err());
        assert_eq!(CascadePolicy::OneHop.to_string(), "one-hop");
    }

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.cache_ttl, Duration::from_secs(3600));
        assert_eq!(options.cascade_policy, CascadePolicy::Transitive);
        assert!(!ImportOptions::default().strict_numeric);
    }
}
