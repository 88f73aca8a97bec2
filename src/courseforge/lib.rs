//! # Courseforge Architecture
//!
//! Courseforge turns a course theme into a structured outline, generates lesson content for
//! it through an external generative service, caches what it generated, and packages the
//! result as single-lesson documents, a course archive or a consolidated ebook.
//!
//! Like its layout suggests, this is a library with a CLI client, not the other way round.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Arguments, terminal output, progress lines, exit codes   │
//! │  - Owns the runtime, Ctrl-C handling and quota retries      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API (api.rs)                                               │
//! │  - Thin facade: one method per operation                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs)                                   │
//! │  - Validation and orchestration, returns `CmdResult`        │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//! ┌────────────────┐  ┌─────────────────┐  ┌─────────────────┐
//! │ jobs, pipeline │  │ history, store  │  │ export          │
//! │ cache-or-      │  │ durable         │  │ templates,      │
//! │ generate, the  │  │ metadata,       │  │ archive, ebook  │
//! │ three stages   │  │ session cache   │  │                 │
//! └────────────────┘  └─────────────────┘  └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Service (service/)                                         │
//! │  - `GenerativeService` trait: Gemini client, scripted fake  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Outline Text Is the Source of Truth
//!
//! A syllabus is stored as the text the service returned (or the user edited). Its
//! module/lesson tree is never stored: [`parser`] recomputes it on every access, and lesson
//! ids are sequential within one parse. Cached content is keyed by those ids, so editing
//! the outline clears the syllabus' cache.
//!
//! ## Durable Metadata, Ephemeral Content
//!
//! Only the metadata projection (id, theme, context, outline) reaches the [`store`]. Lesson
//! bodies live in memory for the session, and in backups.
//!
//! ## No I/O Assumptions in Core
//!
//! From `api.rs` inward nothing prints, exits or reads the terminal. Progress is published
//! on a `watch` channel and status lines go to a caller-supplied sink.
//!
//! ## Module Overview
//!
//! - [`api`]: the facade, entry point for all operations
//! - [`commands`]: one module per operation
//! - [`jobs`]: bulk jobs (archive, ebook) with progress and resume through the cache
//! - [`pipeline`]: draft, enhance and image resolution for one lesson
//! - [`service`]: the generative service trait, the Gemini client and prompts
//! - [`history`], [`cache`], [`store`]: the syllabus repository and its persistence
//! - [`parser`], [`model`]: outline parsing and core data types
//! - [`export`]: rendered documents, archive and ebook
//! - [`config`], [`error`]: configuration and error types

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod jobs;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod service;
pub mod store;
