//! govexec — Library Root
//!
//! Oracle-gated execution client for multisig governance modules.
//! Re-exports all modules for the keeper binary, integration tests,
//! and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
