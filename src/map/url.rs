// src/map/url.rs
//! Request URL templates with `{x}`, `{y}`, `{z}` and `{s}` placeholders

use super::coord::TileCoord;
use super::subdomain::{choose_subdomain, Subdomains};
use crate::error::{MetaError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fill the template for one tile.
    ///
    /// Placeholder names may be padded with spaces (`{ x }`). A placeholder
    /// with no value, including `{s}` when no aliases are configured, is an
    /// error rather than an empty substitution.
    pub fn render(&self, coord: &TileCoord, subdomains: &Subdomains) -> Result<String> {
        let subdomain = choose_subdomain(coord, subdomains);
        let mut out = String::with_capacity(self.0.len() + 16);
        let mut rest = self.0.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let Some(close) = after.find('}') else {
                // Unterminated brace is literal text
                out.push_str(&rest[open..]);
                return Ok(out);
            };

            let name = after[..close].trim();
            if !is_placeholder_name(name) {
                out.push('{');
                rest = after;
                continue;
            }

            match name {
                "x" => out.push_str(&coord.x.to_string()),
                "y" => out.push_str(&coord.y.to_string()),
                "z" => out.push_str(&coord.z.to_string()),
                "s" => match subdomain {
                    Some(s) => out.push_str(s),
                    None => {
                        return Err(MetaError::Template(format!(
                            "No subdomains configured for {{s}} in {}",
                            self.0
                        )))
                    }
                },
                other => {
                    return Err(MetaError::Template(format!(
                        "No value provided for variable {{{}}}",
                        other
                    )))
                }
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UrlTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UrlTemplate {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_placeholders() {
        let template = UrlTemplate::new("https://{s}.meta.example.com/{z}/{x}/{y}.json");
        let url = template
            .render(&TileCoord::new(5, 7, 4), &Subdomains::from("abc"))
            .unwrap();
        // (5 + 7) % 3 == 0
        assert_eq!(url, "https://a.meta.example.com/4/5/7.json");
    }

    #[test]
    fn test_render_padded_placeholder() {
        let template = UrlTemplate::new("/tiles?x={ x }&y={y }&z={ z}");
        let url = template.render(&TileCoord::new(1, 2, 3), &Subdomains::default()).unwrap();
        assert_eq!(url, "/tiles?x=1&y=2&z=3");
    }

    #[test]
    fn test_unknown_placeholder_is_error() {
        let template = UrlTemplate::new("/{z}/{x}/{y}?key={apikey}");
        let err = template
            .render(&TileCoord::new(1, 2, 3), &Subdomains::default())
            .unwrap_err();
        assert!(matches!(err, MetaError::Template(_)));
        assert!(err.to_string().contains("apikey"));
    }

    #[test]
    fn test_missing_subdomains() {
        let empty = Subdomains::new(Vec::<String>::new());
        let coord = TileCoord::new(1, 2, 3);

        assert!(UrlTemplate::new("https://{s}.example.com/{z}").render(&coord, &empty).is_err());
        assert_eq!(
            UrlTemplate::new("https://example.com/{z}").render(&coord, &empty).unwrap(),
            "https://example.com/3"
        );
    }

    #[test]
    fn test_literal_braces_pass_through() {
        let template = UrlTemplate::new("/q={\"a\":1}/{z}/{");
        let url = template.render(&TileCoord::new(0, 0, 9), &Subdomains::default()).unwrap();
        assert_eq!(url, "/q={\"a\":1}/9/{");
    }
}
