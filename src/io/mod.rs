// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations: blob storage, snapshots, exports and image decoding.

pub mod media;
pub mod serialization;
pub mod storage;
