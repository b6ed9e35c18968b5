// src/error.rs
//
// Unified error handling for imagepipe.
// Uses thiserror for simple, type-safe error handling.
//
// Error Taxonomy:
// - UserError: Invalid input, recoverable
// - CodecError: Format/encoding issues
// - ResourceLimit: Memory/dimension limits
// - InternalBug: Library bugs (should not happen)

use std::borrow::Cow;
use thiserror::Error;

/// Coarse error classification for callers that route on failure class
/// rather than on individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by user
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Memory/dimension limits
    ResourceLimit,
    /// Library bugs (should not happen)
    InternalBug,
}

/// imagepipe error types.
///
/// All errors are type-safe and provide clear, actionable messages.
/// No numeric error codes - just clear error variants.
#[derive(Debug, Error)]
pub enum PipeError {
    // Argument / parameter validation
    #[error("{name} {reason}")]
    Validation {
        name: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    // Geometry resolution
    #[error("invalid formula: {spec}")]
    Formula { spec: Cow<'static, str> },

    #[error("invalid operand: {operand} for formula: {spec}")]
    FormulaOperand {
        operand: Cow<'static, str>,
        spec: Cow<'static, str>,
    },

    // Pipeline assembly
    #[error("duplicate operation: '{name}' may only appear once per pipeline")]
    DuplicateOperation { name: Cow<'static, str> },

    #[error("unknown operation: '{name}'")]
    OperationNotFound { name: Cow<'static, str> },

    // Source I/O
    #[error("empty input: {source_name}")]
    EmptyInput { source_name: Cow<'static, str> },

    #[error("file not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("failed to read '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory-map '{path}': {source}")]
    MmapFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read source stream: {source}")]
    StreamReadFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write destination stream: {source}")]
    StreamWriteFailed {
        #[source]
        source: std::io::Error,
    },

    // Codec pass-throughs
    #[error("unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("crop bounds ({x}+{width}, {y}+{height}) exceed image dimensions ({img_width}x{img_height})")]
    InvalidCropBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        img_width: u32,
        img_height: u32,
    },

    // Size limits
    #[error("image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("image pixel count {pixels} exceeds max {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Internal
    #[error("internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

impl PipeError {
    // =========================================================================
    // CONSTRUCTOR HELPERS
    // =========================================================================

    pub fn validation(
        name: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Validation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn formula(spec: impl Into<Cow<'static, str>>) -> Self {
        Self::Formula { spec: spec.into() }
    }

    pub fn formula_operand(
        operand: impl Into<Cow<'static, str>>,
        spec: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::FormulaOperand {
            operand: operand.into(),
            spec: spec.into(),
        }
    }

    pub fn duplicate_operation(name: impl Into<Cow<'static, str>>) -> Self {
        Self::DuplicateOperation { name: name.into() }
    }

    pub fn operation_not_found(name: impl Into<Cow<'static, str>>) -> Self {
        Self::OperationNotFound { name: name.into() }
    }

    pub fn empty_input(source_name: impl Into<Cow<'static, str>>) -> Self {
        Self::EmptyInput {
            source_name: source_name.into(),
        }
    }

    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn mmap_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::MmapFailed {
            path: path.into(),
            source,
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error into the 4-tier taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. }
            | Self::Formula { .. }
            | Self::FormulaOperand { .. }
            | Self::DuplicateOperation { .. }
            | Self::OperationNotFound { .. }
            | Self::EmptyInput { .. }
            | Self::FileNotFound { .. }
            | Self::FileReadFailed { .. }
            | Self::MmapFailed { .. }
            | Self::FileWriteFailed { .. }
            | Self::StreamReadFailed { .. }
            | Self::StreamWriteFailed { .. }
            | Self::InvalidCropBounds { .. } => ErrorCategory::UserError,

            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::ResizeFailed { .. } => ErrorCategory::CodecError,

            Self::DimensionExceedsLimit { .. } | Self::PixelCountExceedsLimit { .. } => {
                ErrorCategory::ResourceLimit
            }

            Self::Internal { .. } => ErrorCategory::InternalBug,
        }
    }
}
