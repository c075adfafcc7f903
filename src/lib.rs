//! Turn a captured view into an AI-rendered image.
//!
//! A [`GenerationController`] takes a frame from a [`ViewCapture`], sends it
//! with the user's prompt to an [`ImageService`] (normally [`GeminiClient`]),
//! and keeps the decoded result for display, export or reuse as the next
//! source.

pub mod capture;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod persistence;

pub use capture::{ImageFileCapture, ViewCapture};
#[cfg(feature = "screen")]
pub use capture::MonitorCapture;
pub use codec::RawFrame;
pub use config::{ServiceConfig, SourceEncoding, SourceMimePolicy};
pub use controller::{
    ActionOutcome, ControllerEvent, ControllerState, DeniedReason, GenerationCompletion,
    GenerationController, PendingGeneration,
};
pub use error::{ErrorKind, RenderError, Result};
pub use export::{DirectoryExporter, FileExporter, ResultExporter};
pub use gemini::{GeminiClient, GenerationResult, ImageService};
pub use models::{GenerationRequest, RenderSettings};
pub use persistence::{AppSettings, JsonSettingsStore, SettingsStore};
