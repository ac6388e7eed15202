//! Local files written by a run.
//!
//! # Submodules
//!
//! - [`json`]: pretty-printed backup of each accepted post
//! - [`sitemap`]: the standard `urlset` sitemap document
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── ai-weekly-nvidia-unveils-new-chips.json   # post + _meta
//! ├── quantum-roundup-may-2025.json
//! └── sitemap.xml                               # rebuilt every run
//! ```

pub mod json;
pub mod sitemap;
