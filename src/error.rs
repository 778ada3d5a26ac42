// In: src/error.rs

//! This module defines the single, unified error type for the entire voxpipe library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Stage-local conditions never travel through this type directly: a stage reports a
//! failed encode with `None` and a failed decode with a nonzero code. The pipeline
//! lifts those into `StageFailed` and `DecodeFailed` so the caller still sees which
//! stage broke.

use std::fmt;
use thiserror::Error;

/// The three positions a stage can occupy inside a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Head,
    Sink,
    Tail,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Head => write!(f, "head"),
            Segment::Sink => write!(f, "sink"),
            Segment::Tail => write!(f, "tail"),
        }
    }
}

/// One failing stage observed during a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub segment: Segment,
    /// Index of the stage inside its chain (0 for the sink).
    pub position: usize,
    pub stage: String,
    /// The raw code the stage returned.
    pub code: i32,
}

/// Outcome of decoding through a chain or a whole pipeline.
///
/// `code()` is the banded integer contract: chain members contribute
/// `10 * (step + 1) + code`, where `step` counts from 0 at the last stage (the
/// first one decoded). The sink adds 10 and the head chain adds 100.
/// `failures()` carries the same information as structured data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStatus {
    code: i32,
    failures: Vec<StageFailure>,
}

impl DecodeStatus {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0 && self.failures.is_empty()
    }

    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }

    /// Records a failure that adds `weighted` to the composite code.
    pub(crate) fn record(&mut self, failure: StageFailure, weighted: i32) {
        self.code += weighted;
        self.failures.push(failure);
    }

    /// Folds a sub-status into this one, shifting its code into a band.
    pub(crate) fn absorb(&mut self, other: DecodeStatus, band: i32) {
        if other.is_ok() {
            return;
        }
        self.code += other.code + band;
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.code)?;
        for failure in &self.failures {
            write!(
                f,
                "; {} stage #{} '{}' returned {}",
                failure.segment, failure.position, failure.stage, failure.code
            )?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    // =========================================================================
    // === Build-Time Errors
    // =========================================================================
    #[error("Unsupported data type for this operation: {0}")]
    UnsupportedType(String),

    #[error("Malformed pipeline description '{input}' at byte {position}: {reason}")]
    Parse {
        input: String,
        position: usize,
        reason: String,
    },

    #[error("Invalid option '{option}' for stage '{stage}': {reason}")]
    InvalidOption {
        stage: String,
        option: String,
        reason: String,
    },

    #[error("Pipeline description names unknown stages: {0:?}")]
    UnknownStages(Vec<String>),

    // =========================================================================
    // === Encode / Decode Errors
    // =========================================================================
    #[error("Stage '{stage}' ({segment} #{position}) failed to encode")]
    StageFailed {
        segment: Segment,
        position: usize,
        stage: String,
    },

    #[error("Decoding failed with {0}")]
    DecodeFailed(DecodeStatus),

    #[error("Cannot encode an empty input")]
    EmptyInput,

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Output buffer too small: need {needed} bytes, got {available}")]
    OutputTooSmall { needed: usize, available: usize },

    #[error("Container header error: {0}")]
    HeaderFormat(String),

    // =========================================================================
    // === Contract Violations (a stage broke its sizing promise)
    // =========================================================================
    #[error("Stage '{stage}' reported {written} bytes written into a {capacity} byte buffer")]
    BufferOverrun {
        stage: String,
        written: usize,
        capacity: usize,
    },

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Byte slice casting error: {0}")]
    PodCast(String), // Manual `From` impl is needed as bytemuck::PodCastError doesn't impl Error

    // =========================================================================
    // === Low-Level Kernel Errors
    // =========================================================================
    #[error("Buffer length mismatch: expected a multiple of {0}, got {1}")]
    BufferMismatch(usize, usize),

    #[error("LZ4 operation failed: {0}")]
    Lz4Error(String),

    #[error("Zstd operation failed: {0}")]
    ZstdError(String),
}

impl PipelineError {
    /// The integer status for this error: the banded code for decode failures,
    /// `-1` for everything else.
    pub fn code(&self) -> i32 {
        match self {
            PipelineError::DecodeFailed(status) => status.code(),
            _ => -1,
        }
    }

    /// True for errors that mean a stage violated its contract rather than
    /// hitting a data-dependent failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PipelineError::BufferOverrun { .. } | PipelineError::InternalError(_)
        )
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<bytemuck::PodCastError> for PipelineError {
    fn from(err: bytemuck::PodCastError) -> Self {
        PipelineError::PodCast(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(segment: Segment, position: usize, code: i32) -> StageFailure {
        StageFailure {
            segment,
            position,
            stage: "bitswap1".into(),
            code,
        }
    }

    #[test]
    fn test_status_absorb_applies_band() {
        let mut tail = DecodeStatus::ok();
        tail.record(failure(Segment::Tail, 0, 1), 11);

        let mut total = DecodeStatus::ok();
        total.absorb(tail, 0);
        total.absorb(DecodeStatus::ok(), 100);
        assert_eq!(total.code(), 11);
        assert_eq!(total.failures().len(), 1);

        let mut head = DecodeStatus::ok();
        head.record(failure(Segment::Head, 1, 1), 21);
        total.absorb(head, 100);
        assert_eq!(total.code(), 11 + 121);
        assert_eq!(total.failures()[1].segment, Segment::Head);
    }

    #[test]
    fn test_error_code_mapping() {
        let mut status = DecodeStatus::ok();
        status.record(failure(Segment::Sink, 0, 1), 11);
        assert_eq!(PipelineError::DecodeFailed(status).code(), 11);
        assert_eq!(PipelineError::EmptyInput.code(), -1);
        assert!(PipelineError::BufferOverrun {
            stage: "lz4".into(),
            written: 10,
            capacity: 4
        }
        .is_contract_violation());
    }
}
