// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Hardware interface layer (HIL) traits and utilities shared by the chip
//! crates in this workspace.
//!
//! Chip drivers are written against the traits here: split-phase operations
//! return immediately and deliver their outcome to a registered client from
//! interrupt context.

#![no_std]

pub mod platform;
pub mod spi;
pub mod utilities;

mod error_code;
pub use error_code::ErrorCode;
