// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Host-agnostic input events.

use crate::util::geometry::ScreenPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Pan modifier (space or alt) is held.
    pub pan: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pos: ScreenPoint,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, pos: ScreenPoint) -> Self {
        Self {
            kind,
            pos,
            modifiers: Modifiers::default(),
        }
    }

    pub fn down(x: f64, y: f64) -> Self {
        Self::new(PointerKind::Down, ScreenPoint::new(x, y))
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerKind::Move, ScreenPoint::new(x, y))
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::new(PointerKind::Up, ScreenPoint::new(x, y))
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Keys the engines react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Delete,
}
