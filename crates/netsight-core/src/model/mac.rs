// MAC addresses key devices in routes, lookups, and the report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MAC address, normalized to uppercase colon-separated format
/// (`AC:CC:8E:0A:69:26`), which is how the backend writes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, or bare 12-digit hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let upper = raw.as_ref().trim().to_uppercase().replace('-', ":");
        if upper.len() == 12 && upper.chars().all(|c| c.is_ascii_hexdigit()) {
            let pairs: Vec<&str> = (0..6).filter_map(|i| upper.get(i * 2..i * 2 + 2)).collect();
            return Self(pairs.join(":"));
        }
        Self(upper)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_separators() {
        assert_eq!(MacAddress::new("ac-cc-8e-0a-69-26").as_str(), "AC:CC:8E:0A:69:26");
        assert_eq!(MacAddress::new(" ac:cc:8e:0a:69:26 ").as_str(), "AC:CC:8E:0A:69:26");
    }

    #[test]
    fn bare_hex_gets_colons() {
        assert_eq!(MacAddress::new("accc8e0a6926").as_str(), "AC:CC:8E:0A:69:26");
    }

    #[test]
    fn equal_after_normalization() {
        assert_eq!(MacAddress::new("AA:BB:CC:DD:EE:FF"), MacAddress::new("aa-bb-cc-dd-ee-ff"));
    }
}
