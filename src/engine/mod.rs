// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image annotation engines: shapes, masks, history and the surface tying them together.

pub mod history;
pub mod input;
pub mod masks;
pub mod shapes;
pub mod surface;
pub mod viewport;

pub use input::{Key, Modifiers, PointerEvent, PointerKind};
pub use surface::{AnnotationSurface, Snapshot};
