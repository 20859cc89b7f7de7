// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use thiserror::Error;

use crate::core::native::NativeStatus;

#[derive(Error, Debug)]
pub enum RenderStreamError {
    #[error("RenderStream is not initialised")]
    NotInitialised,

    #[error("RenderStream library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("Failed to load RenderStream library: {0}")]
    LibraryLoad(String),

    #[error("RenderStream library is missing symbol {0}")]
    MissingSymbol(String),

    #[error("Unsupported graphics backend: {0}")]
    UnsupportedBackend(String),

    #[error("{call} failed: {status}")]
    Native {
        call: &'static str,
        status: NativeStatus,
    },

    #[error("RenderStream library version is incompatible with {major}.{minor}")]
    IncompatibleVersion { major: i32, minor: i32 },

    #[error("{call} still overflowing after {attempts} attempts")]
    BufferOverflow { call: &'static str, attempts: usize },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Parameter binding error: {0}")]
    Binding(String),

    #[error("No stream at index {0}")]
    UnknownStream(usize),

    #[error("Texture operation failed: {0}")]
    Texture(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Cluster negotiation failed: {0}")]
    Negotiation(String),

    #[error("Cluster negotiation timed out after {0:?}")]
    NegotiationTimeout(Duration),

    #[error("Cluster negotiation failed with {} error(s): {}", .0.len(), .0.join("; "))]
    NegotiationAggregate(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderStreamError {
    /// Whether the process must stop using RenderStream altogether.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::LibraryUnavailable(_)
            | Self::LibraryLoad(_)
            | Self::MissingSymbol(_)
            | Self::UnsupportedBackend(_)
            | Self::IncompatibleVersion { .. } => true,
            Self::Native { status, .. } => status.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderStreamError>;
