//! Resource Defaulter - mutating admission webhook for container resources
//!
//! A Kubernetes mutating admission webhook that fills in default CPU and
//! memory requests/limits for Pod containers that omit them. Values the
//! submitter supplied are never changed; a pod whose effective request
//! would exceed its effective limit is denied instead of patched.
//!
//! # Architecture
//!
//! Each admission request flows through two pure components:
//! - the *normalizer* decides, per container and per resource kind, which
//!   of the four fields (limit/request x memory/cpu) to fill and validates
//!   the request <= limit invariant on the outcome;
//! - the *assembler* walks the pod's containers in order and turns those
//!   decisions into a minimal RFC 6902 JSON Patch addressed by container
//!   index.
//!
//! Neither component performs I/O or holds mutable state; the operator
//! defaults are parsed once at startup and shared read-only across
//! handlers.
//!
//! # Modules
//!
//! - [`quantity`] - Kubernetes resource quantity parsing and comparison
//! - [`resources`] - per-container resource view and operator defaults
//! - [`normalize`] - the defaulting decision engine
//! - [`patch`] - JSON Patch assembly
//! - [`webhook`] - axum admission endpoint
//! - [`error`] - error types

#![deny(missing_docs)]

pub mod error;
pub mod normalize;
pub mod patch;
pub mod quantity;
pub mod resources;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
