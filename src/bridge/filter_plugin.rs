//! The callback a host storage library calls when voxpipe is registered as a
//! dynamically loaded dataset filter.
//!
//! The host keeps filter parameters as an opaque byte blob next to the dataset.
//! For voxpipe that blob is a container header (see [`filter_settings`]): it names
//! the pipeline, the element type and the chunk shape. The host then calls
//! [`apply_filter`] once per chunk, in either direction, and replaces the chunk
//! with whatever the filter leaves in the buffer.
//!
//! Following the host convention, a return of `0` means failure and the buffer is
//! left untouched.

use crate::error::PipelineError;
use crate::pipeline::{Header, Pipeline};
use crate::types::ElementType;

/// Registered filter identifier.
pub const FILTER_ID: u32 = 0o1307;
/// Set in `flags` when the host reads data back.
pub const FLAG_REVERSE: u32 = 0x0100;

/// Builds the parameter blob a host stores for a dataset of `element_type`
/// chunks shaped `shape`, filtered by `description`.
pub fn filter_settings(
    element_type: ElementType,
    shape: &[usize],
    description: &str,
) -> Result<Vec<u8>, PipelineError> {
    if !Pipeline::can_be_built_from(description) {
        return Err(PipelineError::Parse {
            input: description.to_string(),
            position: 0,
            reason: "not a buildable pipeline".into(),
        });
    }
    Ok(Header::new(element_type, shape, description)?.to_bytes())
}

/// Filters `buf` in place. Returns the new valid length of `buf`, or 0 on failure.
pub fn apply_filter(flags: u32, header_bytes: &[u8], buf: &mut Vec<u8>) -> usize {
    let result = if flags & FLAG_REVERSE != 0 {
        reverse(header_bytes, buf)
    } else {
        forward(header_bytes, buf)
    };
    match result {
        Ok(output) => {
            *buf = output;
            buf.len()
        }
        Err(e) => {
            log::error!("filter callback failed: {}", e);
            0
        }
    }
}

fn forward(header_bytes: &[u8], buf: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let settings = Header::from_bytes(header_bytes)?;

    // Chunks that already carry a container header are not compressed twice.
    if let Ok(existing) = Header::from_bytes(buf) {
        if !existing.matches(&settings) {
            return Err(PipelineError::HeaderFormat(
                "chunk is encoded with different settings".into(),
            ));
        }
        let payload = existing.payload(buf)?;
        let end = existing.len() + payload.len();
        return Ok(buf[..end].to_vec());
    }

    let mut pipeline = Pipeline::parse(settings.pipeline(), settings.element_type())?;
    pipeline.encode_to_vec(buf, settings.shape())
}

fn reverse(header_bytes: &[u8], buf: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let settings = Header::from_bytes(header_bytes)?;
    let stored = Header::from_bytes(buf)?;
    if !stored.matches(&settings) {
        return Err(PipelineError::HeaderFormat(
            "chunk header does not match the dataset settings".into(),
        ));
    }
    Pipeline::bootstrap(buf)?.decode_to_vec(buf)
}
