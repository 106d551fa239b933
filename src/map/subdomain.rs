// src/map/subdomain.rs
//! Host alias selection for spreading tile requests

use super::coord::TileCoord;
use serde::{Deserialize, Deserializer, Serialize};

/// Host aliases substituted for `{s}` in a URL template.
///
/// Accepts either a string, where every character is one alias (`"abc"`),
/// or an explicit list (`["a", "b", "c"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subdomains(Vec<String>);

impl Subdomains {
    pub fn new<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(aliases.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for Subdomains {
    fn default() -> Self {
        Self::from("abc")
    }
}

impl From<&str> for Subdomains {
    fn from(s: &str) -> Self {
        Self(s.chars().map(String::from).collect())
    }
}

impl From<Vec<String>> for Subdomains {
    fn from(list: Vec<String>) -> Self {
        Self(list)
    }
}

impl<'de> Deserialize<'de> for Subdomains {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Letters(String),
            List(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Letters(s) => Subdomains::from(s.as_str()),
            Raw::List(list) => Subdomains::from(list),
        })
    }
}

/// Pick the alias for a tile: `aliases[|x + y| mod len]`.
///
/// Neighbouring tiles land on different hosts, and the choice is stable
/// for a given coordinate. Returns `None` when no aliases are configured.
pub fn choose_subdomain<'a>(coord: &TileCoord, subdomains: &'a Subdomains) -> Option<&'a str> {
    if subdomains.is_empty() {
        return None;
    }
    let sum = (coord.x as i128 + coord.y as i128).unsigned_abs();
    let index = (sum % subdomains.len() as u128) as usize;
    subdomains.as_slice().get(index).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_splits_into_letters() {
        let subdomains = Subdomains::from("abc");
        assert_eq!(subdomains.as_slice(), &["a", "b", "c"]);
        assert_eq!(Subdomains::default(), subdomains);
    }

    #[test]
    fn test_deserialize_string_or_list() {
        let letters: Subdomains = serde_json::from_str(r#""ab""#).unwrap();
        assert_eq!(letters.as_slice(), &["a", "b"]);

        let list: Subdomains = serde_json::from_str(r#"["tile1", "tile2"]"#).unwrap();
        assert_eq!(list.as_slice(), &["tile1", "tile2"]);
    }

    #[test]
    fn test_choose_subdomain() {
        let subdomains = Subdomains::from("abc");
        assert_eq!(choose_subdomain(&TileCoord::new(0, 0, 1), &subdomains), Some("a"));
        assert_eq!(choose_subdomain(&TileCoord::new(1, 0, 1), &subdomains), Some("b"));
        assert_eq!(choose_subdomain(&TileCoord::new(1, 1, 1), &subdomains), Some("c"));
        assert_eq!(choose_subdomain(&TileCoord::new(2, 2, 3), &subdomains), Some("b"));
        // Negative sums use the absolute value
        assert_eq!(choose_subdomain(&TileCoord::new(-2, 0, 3), &subdomains), Some("c"));
    }

    #[test]
    fn test_choose_subdomain_empty() {
        let subdomains = Subdomains::new(Vec::<String>::new());
        assert_eq!(choose_subdomain(&TileCoord::new(3, 4, 5), &subdomains), None);
    }

    #[test]
    fn test_even_spread() {
        let subdomains = Subdomains::from("ab");
        let mut counts = [0usize; 2];
        for x in 0..20 {
            for y in 0..20 {
                match choose_subdomain(&TileCoord::new(x, y, 10), &subdomains) {
                    Some("a") => counts[0] += 1,
                    Some("b") => counts[1] += 1,
                    other => panic!("unexpected alias {:?}", other),
                }
            }
        }
        assert_eq!(counts, [200, 200]);
    }
}
