//! Workloads and demos for benchmarking the Strata allocators.
//!
//! - [`workload`]: deterministic request-size and key streams shared by the
//!   criterion benches
//! - [`expr`]: an arithmetic expression parser that builds its syntax tree
//!   in an arena, used by the `expr` example

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod expr;
pub mod workload;
