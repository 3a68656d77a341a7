// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod aggregate;
pub mod bestpath;
pub mod db;
pub mod error;
pub mod log;
pub mod types;

pub use db::{Db, Table};
pub use types::*;

#[cfg(test)]
mod proptest;

pub const COMPONENT_RDB: &str = "rdb";
pub const MOD_DB: &str = "database";
