// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: boxes, image items and the persisted project snapshot.

pub mod annotation;
pub mod project;
