//! `retarget_core` keeps one source tree building for several mutually
//! exclusive deployment targets. It toggles target-specific blocks in source
//! files and applies reversible overlays to a shared JSON config document.
//!
//! ## Processing Pipeline
//!
//! ```text
//! retarget.toml
//!   → Config (targets, document layout, source directories, comment profiles)
//!   → Overlay (switches the config document once, recording how to undo it)
//!   → Project walk (sorted files, then sorted subdirectories)
//!   → Scanner (comments out the old target's blocks, uncomments the new one's)
//!   → Engine (collects every change in memory, then writes atomically)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: loading `retarget.toml`.
//! - [`overlay`]: the reversible config document overlay.
//! - [`scanner`]: the per-line directive state machine.
//! - [`profile`]: comment syntax per file extension.
//!
//! ## Source Directives
//!
//! ```ts
//! // #if TARGET == 'vscode'
//! import * as Code from "vscode";
//! // #elseif TARGET == 'coc.nvim'
//! // import * as Code from "coc.nvim";
//! // #endif
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retarget_core::RetargetConfig;
//! use retarget_core::compute_switch;
//! use retarget_core::write_switch;
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = RetargetConfig::load_or_default(root).unwrap();
//! let outcome = compute_switch(root, &config, "coc.nvim").unwrap();
//! println!("{} -> {}", outcome.previous, outcome.current);
//! write_switch(&outcome).unwrap();
//! ```

pub use config::*;
pub use directive::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use overlay::*;
pub use profile::*;
pub use project::*;
pub use scanner::*;
pub use target::*;

pub mod config;
mod directive;
mod document;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod overlay;
pub mod profile;
pub mod project;
pub mod scanner;
mod target;

#[cfg(test)]
mod __fixtures;
