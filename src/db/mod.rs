// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage collaborator surface.
//!
//! The relational store itself is outside this system; `Db` is the
//! typed interface the core consumes (CRUD plus the atomic
//! check-then-insert and upsert-by-key operations the sync engine and
//! booking path rely on). The in-process implementation in `memory`
//! backs the server and the tests.

pub mod memory;

pub use memory::Db;
