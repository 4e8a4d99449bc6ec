//! # collada-loader
//!
//! A streaming loader for COLLADA (`.dae`) documents and zipped COLLADA
//! archives (`.zae`).
//!
//! Documents are read with a SAX parser and never held in memory as a
//! whole. Every element is checked against a table-driven grammar and
//! turned into objects of the [`model`], which are handed to a [`Writer`]
//! as soon as they are complete. Constructs that depend on elements
//! appearing later (or in other documents) are held back and resolved in a
//! post-pass once every document of the scene has been read: skin joints,
//! animation targets, material bindings of controller instances,
//! kinematics bindings and formula references.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Forward and cross-document references (xrefs)
//! - Per-family validation policies (strict, lenient, open)
//! - Selective loading of object kinds
//! - Problems reported through an [`ErrorHandler`] with line and column
//!
//! ## Example
//!
//! ```no_run
//! use collada_loader::{DocumentCollector, Loader, LoaderConfig, TracingErrorHandler};
//!
//! let mut loader = Loader::new(LoaderConfig::new());
//! let mut document = DocumentCollector::new();
//! if loader.load_document("scene.dae", &mut document, &mut TracingErrorHandler) {
//!     for geometry in &document.geometries {
//!         if let Some(mesh) = &geometry.mesh {
//!             println!("{:?}: {} faces", geometry.original_id, mesh.face_count());
//!         }
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "zae")]
pub mod archive;
pub mod config;
pub mod error;
pub mod grammar;
mod intermediate;
pub mod loader;
pub mod model;
mod parser;
mod post_process;
pub mod registry;
pub mod sax;
pub mod sid_tree;
pub mod writer;

pub use config::{LoaderConfig, ObjectFlags};
pub use error::{
    Error, ErrorCode, ErrorCollector, ErrorContext, ErrorHandler, ParserError, Result, Severity,
    TracingErrorHandler,
};
pub use grammar::{Family, ValidationPolicy};
pub use loader::{LoadState, Loader};
pub use model::{
    AnimationCurve, AnimationList, Asset, Camera, ClassId, Controller, Effect, FileId, Formula,
    Geometry, Image, KinematicsModel, KinematicsScene, LibraryNodes, Light, Material, Mesh, Node,
    Scene, SkinController, SkinControllerData, UniqueId, VisualScene,
};
pub use writer::{DocumentCollector, Writer};
