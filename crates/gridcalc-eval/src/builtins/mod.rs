//! Built-in function implementations, one module per family (`spec.md`
//! §4.5). Each module exposes `entries()`, chained together by
//! `crate::registry::build_registry`.

pub mod array_fns;
pub mod database;
pub mod datetime;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod stats;
pub mod support;
pub mod table_fns;
pub mod text;
