// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Per-entity table facades.
//!
//! Each table owns its cache-pool namespaces behind a single mutex, holds
//! handles to the volatile and durable sinks, and exposes the domain
//! operations consumed by the command processors. One critical section
//! spans every multi-step cascade, so two callers can never interleave
//! partial updates for the same key.

pub mod active;
pub mod ans;
pub mod device;
pub mod document;
pub mod user;


pub use active::ActiveTable;
pub use ans::AddressNameTable;
pub use device::DeviceTable;
pub use document::DocumentTable;
pub use user::UserTable;
