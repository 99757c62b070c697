//! # Devpurge
//!
//! A tool for reclaiming disk space from developer caches and build artifacts.
//!
//! Pluggable collectors (frontend, backend, mobile, devops, data/ML and
//! system caches) find reclaimable paths, every path is tagged with a safety
//! level, and the chosen clean level decides what may be deleted.
//!
//! ## Features
//!
//! - Concurrent, cancellable name-pattern scans that stop descending at a match
//! - Parallel size aggregation
//! - Three clean levels: conservative, standard and aggressive
//! - Dry runs that report exactly what a real run would free
//!
//! ## Usage
//!
//! ### Command Line
//!
//! ```bash
//! # Show what could be cleaned
//! devpurge report
//!
//! # Clean frontend and backend caches, safe items only
//! devpurge clean --level conservative -D frontend -D backend
//!
//! # Dry run to see what would be cleaned
//! devpurge clean --dry-run
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use devpurge::{CancelToken, PatternScanner};
//!
//! let dir = tempfile::tempdir()?;
//! std::fs::create_dir_all(dir.path().join("app/node_modules/left-pad"))?;
//!
//! let scanner = PatternScanner::new([dir.path()])?;
//! let found: Vec<_> = scanner.scan("node_modules", &CancelToken::new())?.collect();
//! assert_eq!(found.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export core functionality
pub use devpurge_core::*;
