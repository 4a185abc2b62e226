// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Shared infrastructure for the state database
//!
//! This crate holds the pieces that sit below the trie engine: the backing
//! key-value store abstraction with its atomic batch writer, and the
//! critical-failure policy used by schema writers whose persistence failures
//! must terminate the process rather than corrupt the retention boundary.

/// Critical-failure policies (log-then-terminate and test variants)
pub mod crit;

/// Key-value store abstraction, batch writer, and in-memory reference store
pub mod kv;

pub use crit::{CritPolicy, ExitOnCrit, PanicOnCrit};
pub use kv::{BatchOp, KeyValueStore, MemoryStore, StoreError, StoreResult, WriteBatch};
