//! # lbx-compose - Label Composition for P-touch Archives
//!
//! lbx-compose builds `.lbx` label archives for Brother P-touch tape
//! printers. It provides:
//!
//! - **Document model**: text, images, barcodes, shapes, flex containers
//! - **Text metrics**: font-file, reference-table and heuristic measurement
//! - **Flex layout**: row/column, justify, align, gap, padding, wrap
//! - **Codec**: `label.xml` / `prop.xml` inside a zip, with passthrough of
//!   attributes the model does not own
//!
//! ## Quick Start
//!
//! ```no_run
//! use lbx_compose::{
//!     compose::Composer,
//!     config::ComposeOptions,
//!     document::{Container, FlexStyle, FontInfo, LabelDocument, TapeWidth, LabelLength, Text},
//!     metrics::FontCache,
//! };
//!
//! let options = ComposeOptions::default();
//!
//! let mut doc = LabelDocument::for_tape(TapeWidth::Mm12, LabelLength::Auto);
//! doc.push(
//!     Container::new(FlexStyle::column())
//!         .child(Text::styled("M3 x 8", FontInfo::new("Helsinki", 12.0).bold()))
//!         .child(Text::new("DIN 912")),
//! );
//!
//! // Resolve fonts once, then share the cache read-only
//! let mut cache = FontCache::new(options.fonts.library());
//! cache.prepare(&doc);
//!
//! let composer = Composer::new(&cache, options);
//! let composed = composer.compose_to_path(&doc, "bin-label.lbx")?;
//! for warning in &composed.warnings {
//!     eprintln!("{warning}");
//! }
//!
//! # Ok::<(), lbx_compose::error::LbxError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Label document model and tape presets |
//! | [`metrics`] | Font resolution and metrics |
//! | [`text`] | Text extent measurement |
//! | [`layout`] | Flex layout engine |
//! | [`codec`] | Archive reader and writer |
//! | [`compose`] | Layout + serialize pipeline, batches |
//! | [`config`] | Options |
//! | [`error`] | Error and warning types |

pub mod codec;
pub mod compose;
pub mod config;
pub mod document;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod text;
pub mod units;

// Re-exports for convenience
pub use compose::{Composed, Composer};
pub use config::ComposeOptions;
pub use document::LabelDocument;
pub use error::{LbxError, Warning};
