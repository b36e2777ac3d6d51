// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Utility functions and macros provided by the HIL crate.

pub mod cells;
mod static_ref;

pub use static_ref::StaticRef;
