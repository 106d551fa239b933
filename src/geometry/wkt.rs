// src/geometry/wkt.rs
//! Well-known-text parsing
//!
//! Supports `POINT`, `MULTIPOINT`, `LINESTRING`, `MULTILINESTRING`, `POLYGON`
//! and `MULTIPOLYGON`. Keywords are case-insensitive, `Z`/`M`/`ZM` dimension
//! tags are accepted and the extra ordinates dropped.

use super::{Geometry, LatLng, Ring};
use crate::error::{MetaError, Result};

/// Parse a WKT string into a [`Geometry`]
pub fn parse(text: &str) -> Result<Geometry> {
    let mut parser = Parser::new(text);
    let geometry = parser.geometry()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("trailing characters"));
    }
    Ok(geometry)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn geometry(&mut self) -> Result<Geometry> {
        let kind = self.word().to_ascii_uppercase();
        if kind.is_empty() {
            return Err(self.error("expected geometry type"));
        }

        // Optional dimension tag, e.g. "POINT Z (1 2 3)"
        let save = self.pos;
        let tag = self.word().to_ascii_uppercase();
        if !matches!(tag.as_str(), "Z" | "M" | "ZM") {
            self.pos = save;
        }

        let empty = self.empty_marker();

        match kind.as_str() {
            "POINT" => {
                if empty {
                    return Err(self.error("empty point has no position"));
                }
                self.expect('(')?;
                let p = self.position()?;
                self.expect(')')?;
                Ok(Geometry::Point(p))
            }
            "MULTIPOINT" => {
                if empty {
                    return Ok(Geometry::MultiPoint(Vec::new()));
                }
                Ok(Geometry::MultiPoint(self.multipoint()?))
            }
            "LINESTRING" => {
                if empty {
                    return Ok(Geometry::LineString(Vec::new()));
                }
                Ok(Geometry::LineString(self.positions()?))
            }
            "MULTILINESTRING" => {
                if empty {
                    return Ok(Geometry::MultiLineString(Vec::new()));
                }
                Ok(Geometry::MultiLineString(self.list(Self::positions)?))
            }
            "POLYGON" => {
                if empty {
                    return Ok(Geometry::Polygon(Vec::new()));
                }
                Ok(Geometry::Polygon(self.rings()?))
            }
            "MULTIPOLYGON" => {
                if empty {
                    return Ok(Geometry::MultiPolygon(Vec::new()));
                }
                Ok(Geometry::MultiPolygon(self.list(Self::rings)?))
            }
            other => Err(MetaError::Wkt(format!("unsupported geometry type {}", other))),
        }
    }

    fn empty_marker(&mut self) -> bool {
        let save = self.pos;
        if self.word().eq_ignore_ascii_case("EMPTY") {
            true
        } else {
            self.pos = save;
            false
        }
    }

    fn rings(&mut self) -> Result<Vec<Ring>> {
        self.list(Self::positions)
    }

    /// `( item, item, ... )`
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect('(')?;
        let mut items = vec![item(self)?];
        while self.consume(',') {
            items.push(item(self)?);
        }
        self.expect(')')?;
        Ok(items)
    }

    /// `( x y, x y, ... )`
    fn positions(&mut self) -> Result<Vec<LatLng>> {
        self.list(Self::position)
    }

    /// Multipoints come both as `(1 2, 3 4)` and `((1 2), (3 4))`.
    fn multipoint(&mut self) -> Result<Vec<LatLng>> {
        self.list(|p| {
            if p.consume('(') {
                let point = p.position()?;
                p.expect(')')?;
                Ok(point)
            } else {
                p.position()
            }
        })
    }

    fn position(&mut self) -> Result<LatLng> {
        let lng = self.number()?;
        let lat = self.number()?;
        // Drop Z and M ordinates
        for _ in 0..2 {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                    self.number()?;
                }
                _ => break,
            }
        }
        Ok(LatLng::new(lat, lng))
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        let value: f64 = text
            .parse()
            .map_err(|_| self.error_at(start, "expected number"))?;
        if !value.is_finite() {
            return Err(self.error_at(start, "number out of range"));
        }
        Ok(value)
    }

    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        if self.consume(ch) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", ch)))
        }
    }

    fn consume(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, what: &str) -> MetaError {
        self.error_at(self.pos, what)
    }

    fn error_at(&self, pos: usize, what: &str) -> MetaError {
        let fragment: String = self.input[pos..].chars().take(24).collect();
        MetaError::Wkt(format!("{} at offset {} near {:?}", what, pos, fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point() {
        assert_eq!(parse("POINT(1 1)").unwrap(), Geometry::Point(LatLng::new(1.0, 1.0)));
        assert_eq!(
            parse("  point ( 82.9 55.03 ) ").unwrap(),
            Geometry::Point(LatLng::new(55.03, 82.9))
        );
    }

    #[test]
    fn test_point_with_z() {
        assert_eq!(
            parse("POINT Z (30 10 250)").unwrap(),
            Geometry::Point(LatLng::new(10.0, 30.0))
        );
        assert_eq!(
            parse("POINT(30 10 250)").unwrap(),
            Geometry::Point(LatLng::new(10.0, 30.0))
        );
    }

    #[test]
    fn test_polygon_with_hole() {
        let geometry = parse(
            "POLYGON((35 10, 45 45, 15 40, 10 20, 35 10),(20 30, 35 35, 30 20, 20 30))",
        )
        .unwrap();
        let Geometry::Polygon(rings) = geometry else {
            panic!("expected polygon");
        };
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0][1], LatLng::new(45.0, 45.0));
        assert_eq!(rings[1][0], LatLng::new(30.0, 20.0));
    }

    #[test]
    fn test_multipolygon() {
        let geometry = parse(
            "MULTIPOLYGON(((30 20, 45 40, 10 40, 30 20)),((15 5, 40 10, 10 20, 5 10, 15 5)))",
        )
        .unwrap();
        let Geometry::MultiPolygon(polygons) = geometry else {
            panic!("expected multipolygon");
        };
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[1][0].len(), 5);
    }

    #[test]
    fn test_multipoint_both_forms() {
        let bare = parse("MULTIPOINT(10 40, 40 30)").unwrap();
        let wrapped = parse("MULTIPOINT((10 40), (40 30))").unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.positions().len(), 2);
    }

    #[test]
    fn test_linestrings() {
        let line = parse("LINESTRING(30 10, 10 30, 40 40)").unwrap();
        assert_eq!(line.positions().len(), 3);

        let lines = parse("MULTILINESTRING((10 10, 20 20), (40 40, 30 30, 40 20))").unwrap();
        assert_eq!(lines.positions().len(), 5);
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse("POLYGON EMPTY").unwrap(), Geometry::Polygon(vec![]));
        assert!(parse("POINT EMPTY").is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(parse("").is_err());
        assert!(parse("POINT(1)").is_err());
        assert!(parse("POINT(1 1").is_err());
        assert!(parse("POINT(1 1) extra").is_err());
        assert!(parse("POINT(a b)").is_err());
        assert!(parse("CIRCLE(1 1, 2)").is_err());
        assert!(parse("POLYGON((1 1, 2 2,))").is_err());
    }
}
