// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: annotations, masks, tracks and the project bundle.

pub mod annotation;
pub mod color;
pub mod mask;
pub mod project;
pub mod track;
