// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the persisted shape annotations: bounding boxes,
//! polygons, landmarks and freeform strokes. All coordinates are normalized
//! to the image's intrinsic size.

use super::color::Rgb;
use crate::error::AnnotError;
use crate::util::geometry::UnitPoint;
use serde::{Deserialize, Serialize};

/// Type of annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Bbox,
    Polygon,
    Landmark,
    Freeform,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Bbox => "bbox",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Landmark => "landmark",
            ShapeKind::Freeform => "freeform",
        }
    }
}

/// Normalized axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxCoords {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Normalized freeform stroke.
///
/// `path` holds offsets from (`left`, `top`); an absolute point is
/// `left + p.x * scale_x`, `top + p.y * scale_y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeformCoords {
    pub path: Vec<UnitPoint>,
    pub left: f64,
    pub top: f64,
    #[serde(default = "unit_scale")]
    pub scale_x: f64,
    #[serde(default = "unit_scale")]
    pub scale_y: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl FreeformCoords {
    /// Build from absolute normalized points, anchoring at their minimum corner.
    pub fn from_absolute(points: &[UnitPoint]) -> Self {
        let left = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let top = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let (left, top) = if points.is_empty() { (0.0, 0.0) } else { (left, top) };
        Self {
            path: points
                .iter()
                .map(|p| UnitPoint::new(p.x - left, p.y - top))
                .collect(),
            left,
            top,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Absolute normalized points with the scale applied.
    pub fn absolute_points(&self) -> Vec<UnitPoint> {
        self.path
            .iter()
            .map(|p| UnitPoint::new(self.left + p.x * self.scale_x, self.top + p.y * self.scale_y))
            .collect()
    }
}

/// Type-specific normalized geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinates {
    Bbox(BoxCoords),
    Polygon(Vec<UnitPoint>),
    Landmark(UnitPoint),
    Freeform(FreeformCoords),
}

impl Coordinates {
    /// Pull every value into `[0, 1]`, absorbing rounding at the image edge.
    pub fn clamp_to_unit(&mut self) {
        let clamp = |p: UnitPoint| UnitPoint::new(p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0));
        match self {
            Coordinates::Bbox(b) => {
                b.x = b.x.clamp(0.0, 1.0);
                b.y = b.y.clamp(0.0, 1.0);
                b.width = b.width.clamp(0.0, 1.0 - b.x);
                b.height = b.height.clamp(0.0, 1.0 - b.y);
            }
            Coordinates::Polygon(pts) => {
                for p in pts.iter_mut() {
                    *p = clamp(*p);
                }
            }
            Coordinates::Landmark(p) => *p = clamp(*p),
            Coordinates::Freeform(f) => {
                let points: Vec<UnitPoint> = f.absolute_points().into_iter().map(clamp).collect();
                *f = FreeformCoords::from_absolute(&points);
            }
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Coordinates::Bbox(_) => ShapeKind::Bbox,
            Coordinates::Polygon(_) => ShapeKind::Polygon,
            Coordinates::Landmark(_) => ShapeKind::Landmark,
            Coordinates::Freeform(_) => ShapeKind::Freeform,
        }
    }
}

/// A labeled shape annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnnotation", into = "RawAnnotation")]
pub struct Annotation {
    pub label: String,
    pub color: Rgb,
    pub coordinates: Coordinates,
}

impl Annotation {
    /// Create a new annotation with the given label, color and geometry.
    pub fn new(label: impl Into<String>, color: Rgb, coordinates: Coordinates) -> Self {
        Self {
            label: label.into(),
            color,
            coordinates,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.coordinates.kind()
    }
}

/// Wire form: `{type, label, color, coordinates}` with `coordinates`
/// interpreted according to `type`.
#[derive(Serialize, Deserialize)]
struct RawAnnotation {
    #[serde(rename = "type")]
    kind: ShapeKind,
    label: String,
    color: Rgb,
    coordinates: serde_json::Value,
}

impl TryFrom<RawAnnotation> for Annotation {
    type Error = AnnotError;

    fn try_from(raw: RawAnnotation) -> Result<Self, Self::Error> {
        let kind = raw.kind;
        let invalid = |e: serde_json::Error| AnnotError::invalid_coordinates(kind.as_str(), e.to_string());
        let coordinates = match kind {
            ShapeKind::Bbox => Coordinates::Bbox(serde_json::from_value(raw.coordinates).map_err(invalid)?),
            ShapeKind::Polygon => {
                let points: Vec<UnitPoint> = serde_json::from_value(raw.coordinates).map_err(invalid)?;
                if points.len() < 3 {
                    return Err(AnnotError::invalid_coordinates(
                        kind.as_str(),
                        format!("polygon needs at least 3 points, got {}", points.len()),
                    ));
                }
                Coordinates::Polygon(points)
            }
            ShapeKind::Landmark => Coordinates::Landmark(serde_json::from_value(raw.coordinates).map_err(invalid)?),
            ShapeKind::Freeform => Coordinates::Freeform(serde_json::from_value(raw.coordinates).map_err(invalid)?),
        };
        Ok(Self {
            label: raw.label,
            color: raw.color,
            coordinates,
        })
    }
}

impl From<Annotation> for RawAnnotation {
    fn from(annotation: Annotation) -> Self {
        let kind = annotation.kind();
        let coordinates = match annotation.coordinates {
            Coordinates::Bbox(b) => serde_json::to_value(b),
            Coordinates::Polygon(points) => serde_json::to_value(points),
            Coordinates::Landmark(p) => serde_json::to_value(p),
            Coordinates::Freeform(f) => serde_json::to_value(f),
        }
        .unwrap_or(serde_json::Value::Null);
        Self {
            kind,
            label: annotation.label,
            color: annotation.color,
            coordinates,
        }
    }
}
