//! # Processos
//!
//! A CRUD backend for managing processes ("processos"): each process carries
//! a title, description, priority, a start/end date range, and an ordered
//! checklist of sub-steps. A process's completion flag is never set by
//! clients; it is derived from its sub-steps and recomputed on every write.
//!
//! ## Modules
//!
//! - `api` - axum HTTP surface with a uniform response envelope
//! - `config` - application configuration (file + environment)
//! - `dto` - wire-contract request/response types
//! - `error` - crate-level error taxonomy
//! - `model` - domain entities and the completion-aggregation rule
//! - `service` - orchestration between validation, entities, and the store
//! - `storage` - abstract process store with memory and SQLite backends
//! - `validation` - required-field and date-range checks

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
pub mod model;
pub mod service;
pub mod storage;
pub mod validation;

pub use error::{Error, Result};
