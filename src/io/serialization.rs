// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project data serialization and deserialization.
//!
//! Whole projects export to and import from YAML or JSON. The per-part
//! parsers used when a host hands over persisted JSON are lenient: malformed
//! input is logged and treated as empty instead of failing the load.

use crate::models::annotation::Annotation;
use crate::models::mask::MaskRecord;
use crate::models::project::ProjectData;
use crate::models::track::Track;
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Export project data to YAML format.
pub fn export_yaml(data: &ProjectData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export project data to JSON format.
pub fn export_json(data: &ProjectData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import project data from YAML format.
pub fn import_yaml(path: &Path) -> Result<ProjectData> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import project data from JSON format.
pub fn import_json(path: &Path) -> Result<ProjectData> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

/// Export choosing the format from the file extension.
pub fn export_project(data: &ProjectData, path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

/// Import choosing the format from the file extension.
pub fn import_project(path: &Path) -> Result<ProjectData> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => import_yaml(path),
        Some("json") => import_json(path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

pub fn annotations_to_json(annotations: &[Annotation]) -> Result<String> {
    Ok(serde_json::to_string(annotations)?)
}

/// Parse a persisted shape list; malformed input yields an empty list.
pub fn parse_annotations_lenient(json: &str) -> Vec<Annotation> {
    if json.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(json).unwrap_or_else(|e| {
        log::warn!("Ignoring malformed annotations: {}", e);
        Vec::new()
    })
}

/// Parse a persisted `label -> mask` map; malformed input yields no masks.
pub fn parse_masks_lenient(json: &str) -> BTreeMap<String, MaskRecord> {
    if json.trim().is_empty() {
        return BTreeMap::new();
    }
    serde_json::from_str(json).unwrap_or_else(|e| {
        log::warn!("Ignoring malformed masks: {}", e);
        BTreeMap::new()
    })
}

/// Parse a persisted `id -> track` map; malformed input yields no tracks.
pub fn parse_tracks_lenient(json: &str) -> BTreeMap<u32, Track> {
    if json.trim().is_empty() {
        return BTreeMap::new();
    }
    serde_json::from_str(json).unwrap_or_else(|e| {
        log::warn!("Ignoring malformed tracks: {}", e);
        BTreeMap::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::{BoxCoords, Coordinates};
    use crate::models::color::Rgb;
    use crate::models::track::{BBox, Interpolation, Keyframe};

    fn sample_project() -> ProjectData {
        let mut project = ProjectData::new("street.png".to_string(), 640, 480);
        project.annotations.push(Annotation::new(
            "car",
            Rgb::new(255, 0, 0),
            Coordinates::Bbox(BoxCoords {
                x: 0.25,
                y: 0.5,
                width: 0.125,
                height: 0.0625,
            }),
        ));
        project.masks.insert(
            "road".to_string(),
            MaskRecord {
                color: Rgb::new(0, 0, 255),
                rle: vec![0, 307200],
                width: 640,
                height: 480,
            },
        );
        let mut track = Track::new(1, "car", Rgb::new(255, 0, 0), Interpolation::Cubic);
        track.insert_keyframe(Keyframe {
            frame: 4,
            time: 0.125,
            bbox: BBox::new(0.5, 0.5, 0.25, 0.25),
        });
        project.tracks.insert(1, track);
        project
    }

    #[test]
    fn json_and_yaml_files_roundtrip() {
        let dir = std::env::temp_dir().join(format!("vannot-serialization-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let project = sample_project();
        for name in ["project.json", "project.yaml"] {
            let path = dir.join(name);
            export_project(&project, &path).unwrap();
            assert_eq!(import_project(&path).unwrap(), project);
        }
        assert!(export_project(&project, &dir.join("project.txt")).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_annotations_degrade_to_empty() {
        assert!(parse_annotations_lenient("").is_empty());
        assert!(parse_annotations_lenient("{oops").is_empty());
        assert!(parse_annotations_lenient(r#"[{"type":"circle"}]"#).is_empty());
        let json = annotations_to_json(&sample_project().annotations).unwrap();
        assert_eq!(parse_annotations_lenient(&json).len(), 1);
    }

    #[test]
    fn masks_and_tracks_parse_leniently() {
        let project = sample_project();
        let masks = serde_json::to_string(&project.masks).unwrap();
        assert_eq!(parse_masks_lenient(&masks), project.masks);
        assert!(parse_masks_lenient("[1,2]").is_empty());

        let tracks = serde_json::to_string(&project.tracks).unwrap();
        assert_eq!(parse_tracks_lenient(&tracks), project.tracks);
        assert!(parse_tracks_lenient("null").is_empty());
    }
}
