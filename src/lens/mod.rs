//! Lens module
//!
//! High-level operations that combine business logic with output formatting,
//! reusable from the CLI and from library callers.
//!
//! # Architecture
//!
//! Each lens module exports:
//! - A **Lens struct** (e.g. `TrackingCodeLens`), the main entry point
//! - **Args structs**, input arguments for lens methods
//! - **Output types**, return types and format enums
//!
//! # Usage
//!
//! ```rust,ignore
//! use sitegauge::lens::tracking::{TrackingCodeArgs, TrackingCodeLens, TrackingLanguage};
//! use sitegauge::lens::utils::OutputFormat;
//! ```

pub mod utils;

// TrackingCodeLens - tracking snippet generation
pub mod tracking;
