//! Level descriptor: where the vines hang and how long they are.
//!
//! A level file is a JSON array of records:
//!
//! ```json
//! [ { "length": 8, "relAnchorPoint": "{0.55, 0.95}" } ]
//! ```
//!
//! Anchors are unit coordinates of the scene, (0,0) bottom-left and (1,1)
//! top-right.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::math::Vec2;

const BUNDLED_LEVEL: &str = include_str!("../assets/levels/vine_data.json");

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level descriptor: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("level has no vines")]
    Empty,
    #[error("vine {index} has length 0")]
    ZeroLength { index: usize },
    #[error("vine {index} anchor ({x}, {y}) is outside the unit square")]
    AnchorOutOfRange { index: usize, x: f32, y: f32 },
}

/// Anchor point in unit scene coordinates.
///
/// Parsed from `"{x, y}"`; the braces are optional.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct RelativeAnchor(pub Vec2);

impl RelativeAnchor {
    /// Scene position of this anchor for a scene of the given size.
    pub fn resolve(&self, scene_size: Vec2) -> Vec2 {
        self.0.scale_by(scene_size)
    }

    fn in_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.0.x) && (0.0..=1.0).contains(&self.0.y)
    }
}

impl std::str::FromStr for RelativeAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .trim_start_matches('{')
            .trim_end_matches('}');
        let mut parts = inner.split(',').map(str::trim);
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("expected \"{{x, y}}\", got {s:?}"));
        };
        let x: f32 = x.parse().map_err(|_| format!("bad x coordinate in {s:?}"))?;
        let y: f32 = y.parse().map_err(|_| format!("bad y coordinate in {s:?}"))?;
        Ok(Self(Vec2::new(x, y)))
    }
}

impl TryFrom<String> for RelativeAnchor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Placement of one vine.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct VineDescriptor {
    /// Number of segments.
    pub length: usize,
    #[serde(rename = "relAnchorPoint", alias = "relativeAnchor")]
    pub relative_anchor: RelativeAnchor,
}

impl VineDescriptor {
    pub fn new(length: usize, anchor: Vec2) -> Self {
        Self {
            length,
            relative_anchor: RelativeAnchor(anchor),
        }
    }
}

/// Ordered vine placements of a level. Always validated.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelDescriptor {
    vines: Vec<VineDescriptor>,
}

impl LevelDescriptor {
    pub fn new(vines: Vec<VineDescriptor>) -> Result<Self, LevelError> {
        let level = Self { vines };
        level.validate()?;
        Ok(level)
    }

    /// The level shipped with the crate.
    pub fn bundled() -> Result<Self, LevelError> {
        Self::from_json(BUNDLED_LEVEL)
    }

    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let vines: Vec<VineDescriptor> = serde_json::from_str(json)?;
        Self::new(vines)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let json = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let level = Self::from_json(&json)?;
        log::debug!("loaded {} vines from {:?}", level.vines.len(), path);
        Ok(level)
    }

    pub fn vines(&self) -> &[VineDescriptor] {
        &self.vines
    }

    fn validate(&self) -> Result<(), LevelError> {
        if self.vines.is_empty() {
            return Err(LevelError::Empty);
        }
        for (index, vine) in self.vines.iter().enumerate() {
            if vine.length == 0 {
                return Err(LevelError::ZeroLength { index });
            }
            if !vine.relative_anchor.in_unit_square() {
                let Vec2 { x, y } = vine.relative_anchor.0;
                return Err(LevelError::AnchorOutOfRange { index, x, y });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_level_is_valid() {
        let level = LevelDescriptor::bundled().unwrap();
        assert_eq!(level.vines().len(), 3);
        assert_eq!(level.vines()[1].length, 8);
        assert_eq!(level.vines()[1].relative_anchor.0, Vec2::new(0.55, 0.95));
    }

    #[test]
    fn anchor_strings_parse_with_or_without_braces() {
        let a: RelativeAnchor = "{0.25, 0.5}".parse().unwrap();
        let b: RelativeAnchor = " 0.25,0.5 ".parse().unwrap();
        assert_eq!(a, b);
        assert!("{0.25}".parse::<RelativeAnchor>().is_err());
        assert!("{0.25, 0.5, 1}".parse::<RelativeAnchor>().is_err());
        assert!("{x, 0.5}".parse::<RelativeAnchor>().is_err());
    }

    #[test]
    fn relative_anchor_alias_is_accepted() {
        let level =
            LevelDescriptor::from_json(r#"[{"length": 2, "relativeAnchor": "0.5, 1"}]"#).unwrap();
        assert_eq!(
            level.vines()[0].relative_anchor.resolve(Vec2::new(200.0, 100.0)),
            Vec2::new(100.0, 100.0)
        );
    }

    #[test]
    fn malformed_levels_are_rejected() {
        assert!(matches!(
            LevelDescriptor::from_json("[]"),
            Err(LevelError::Empty)
        ));
        assert!(matches!(
            LevelDescriptor::from_json(r#"[{"length": 0, "relAnchorPoint": "{0.5, 0.5}"}]"#),
            Err(LevelError::ZeroLength { index: 0 })
        ));
        assert!(matches!(
            LevelDescriptor::from_json(
                r#"[{"length": 3, "relAnchorPoint": "{0.5, 0.5}"},
                    {"length": 3, "relAnchorPoint": "{1.5, 0.5}"}]"#
            ),
            Err(LevelError::AnchorOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            LevelDescriptor::from_json(r#"[{"length": -1, "relAnchorPoint": "{0.5, 0.5}"}]"#),
            Err(LevelError::Parse(_))
        ));
        assert!(matches!(
            LevelDescriptor::from_json(r#"[{"length": 2, "relAnchorPoint": "nowhere"}]"#),
            Err(LevelError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LevelDescriptor::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LevelError::Io { .. }));
        assert!(err.to_string().contains("here.json"));
    }
}
