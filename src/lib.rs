//! # shadafile
//!
//! A reader, writer, and merger for a text editor's ShaDa ("shared data")
//! persistence file: the per-session record of command/search history,
//! registers, marks, jump and change lists, search patterns, global
//! variables, and the open buffer list.
//!
//! ShaDa is a self-describing, type-tagged, length-prefixed binary format
//! built on a MessagePack-shaped wire encoding ([`msgpack`]). Every record
//! carries a timestamp, which is what makes merging possible: writing a
//! session's state back to disk never simply overwrites the file, it
//! streams the previous file's records through a set of per-category
//! mergers ([`history`], [`marks`], [`registers`], [`variables`]) so that
//! whichever side — the live editor or the file on disk — has the newer
//! timestamp wins, with ties going to the live editor (§3's central
//! invariant).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         editor (host)                       │
//! │   history rings · marks · registers · variables · buffers   │
//! └───────────────┬───────────────────────────────┬─────────────┘
//!                 │ read (install)                │ write (snapshot)
//!                 ▼                               ▼
//!         ┌───────────────┐               ┌───────────────────┐
//!         │    reader     │               │       writer       │
//!         │  (C8 driver)  │               │   (C7 orchestrator) │
//!         └───────┬───────┘               └──────────┬─────────┘
//!                 │                                   │
//!                 │         history / marks /         │
//!                 │         registers / variables     │
//!                 │         mergers, newest-wins       │
//!                 ▼                                   ▼
//!         ┌───────────────────────────────────────────────────┐
//!         │            record (typed payloads)                │
//!         └───────────────────────┬────────────────────────────┘
//!                                 ▼
//!                         ┌───────────────┐
//!                         │    msgpack    │
//!                         │  (wire codec) │
//!                         └───────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`msgpack`] | Self-describing wire codec: `Value`, record framing, streaming skip |
//! | [`record`] | Typed per-record-type payloads on top of [`msgpack::Value`] |
//! | [`editor`] | Producer/consumer traits the host editor implements against |
//! | [`history`] | Command/search/expr/input/debug history ring merger (C3) |
//! | [`marks`] | Global, numbered, and local mark tables plus jump/change lists (C4) |
//! | [`registers`] | Register bank merger, addressable-name bijection (C5) |
//! | [`variables`] | Global variable dumper, cyclic-container detection (C6) |
//! | [`writer`] | End-to-end write orchestrator: merge, temp file, atomic rename (C7) |
//! | [`reader`] | End-to-end read driver: stream, merge, install into the editor (C8) |
//! | [`error`] | The crate's error taxonomy, numbered after the source format's own codes |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shadafile::editor::TestEditor;
//! use shadafile::writer::{write_shada, ShadaOptions};
//! use shadafile::reader::{read_shada, ReadFlags};
//! use std::path::Path;
//!
//! let editor = TestEditor::new();
//! let options = ShadaOptions::default();
//!
//! // Merge the live editor's state with whatever is already on disk and
//! // atomically replace it.
//! write_shada(
//!     Path::new("/tmp/session.shada"),
//!     Some(Path::new("/tmp/session.shada")),
//!     &options,
//!     &editor,
//!     "shadafile",
//!     env!("CARGO_PKG_VERSION"),
//! ).unwrap();
//!
//! // Later, load it back into a fresh editor.
//! let mut editor = TestEditor::new();
//! let flags = ReadFlags { want_marks: true, ..ReadFlags::default() };
//! read_shada(Path::new("/tmp/session.shada"), &flags, &options, &mut editor).unwrap();
//! ```

#![allow(dead_code)]

pub mod editor;
pub mod error;
pub mod history;
pub mod marks;
pub mod msgpack;
pub mod reader;
pub mod record;
pub mod registers;
pub mod variables;
pub mod writer;
