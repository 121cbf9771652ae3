// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the BOXTAG application.

pub mod canvas;
pub mod gallery;
pub mod properties;
pub mod toolbar;
