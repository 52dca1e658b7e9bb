// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation engines.

pub type Result<T> = std::result::Result<T, AnnotError>;

#[derive(thiserror::Error, Debug)]
pub enum AnnotError {
    /// The image has no usable on-surface placement yet.
    #[error("degenerate image frame: {width}x{height}")]
    DegenerateFrame { width: f64, height: f64 },

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid coordinates for {kind}: {reason}")]
    InvalidCoordinates { kind: String, reason: String },

    #[error("rle covers {actual} pixels, expected {expected}")]
    RleMismatch { expected: u64, actual: u64 },

    #[error("no active track")]
    NoActiveTrack,

    #[error("unknown track id {0}")]
    UnknownTrack(u32),

    #[error("image load error: {0}")]
    ImageLoad(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnnotError {
    pub fn invalid_coordinates(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AnnotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        let err = AnnotError::DegenerateFrame {
            width: 0.0,
            height: 10.0,
        };
        assert!(err.to_string().contains("degenerate image frame"));
        assert!(AnnotError::invalid_coordinates("bbox", "missing x")
            .to_string()
            .contains("bbox"));
        assert_eq!(AnnotError::UnknownTrack(7).to_string(), "unknown track id 7");
    }

    #[test]
    fn other_preserves_source() {
        let err = AnnotError::Other(anyhow::anyhow!("boom"));
        assert!(err.to_string().contains("boom"));
    }
}
