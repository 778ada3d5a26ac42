//! Building pipelines from descriptions.
//!
//! Two entry points with different contracts:
//! - [`Pipeline::from_string`] is lenient. Steps that match no registry are left
//!   out of the pipeline and reported back in [`LenientBuild::skipped`].
//! - [`Pipeline::parse`] is strict. Every step must resolve, and the description
//!   must pass [`Pipeline::can_be_built_from`].

use crate::error::PipelineError;
use crate::parser::{parse_by, StepDescriptor, STEP_SEPARATOR};
use crate::pipeline::core::Pipeline;
use crate::pipeline::header::Header;
use crate::stages::{FilterRegistry, SinkRegistry};
use crate::types::ElementType;

/// A pipeline built by the lenient builder, plus every step it had to drop.
#[derive(Debug, Clone)]
pub struct LenientBuild {
    pub pipeline: Pipeline,
    pub skipped: Vec<String>,
}

impl LenientBuild {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn into_pipeline(self) -> Pipeline {
        self.pipeline
    }
}

/// True if the steps, re-joined, reproduce every byte of `description`.
fn reproduces(steps: &[StepDescriptor], description: &str) -> bool {
    let joined: usize = steps.iter().map(StepDescriptor::serialized_len).sum();
    let separators = steps.len().saturating_sub(1) * STEP_SEPARATOR.len();
    joined + separators == description.len()
        && crate::parser::join_steps(steps, STEP_SEPARATOR) == description
}

impl Pipeline {
    /// Builds a pipeline over `raw_type` from `description`, skipping unknown steps.
    ///
    /// Before a sink is placed a step is tried as a head filter, then as a sink.
    /// After it, steps are only tried as tail filters over the sink's output type.
    ///
    /// # Errors
    /// A malformed description or an invalid stage option still fails the build.
    pub fn from_string(description: &str, raw_type: ElementType) -> Result<LenientBuild, PipelineError> {
        let steps = parse_by(description, STEP_SEPARATOR)?;
        let mut pipeline = Pipeline::new(raw_type);
        let mut skipped = Vec::new();

        for step in &steps {
            if !pipeline.is_compressor() {
                if let Some(filter) = FilterRegistry::create(&step.name, &step.options, raw_type)? {
                    pipeline.push_filter(filter);
                } else if let Some(sink) = SinkRegistry::create(&step.name, &step.options, raw_type)? {
                    pipeline.set_sink(sink);
                } else {
                    log::warn!("skipping unknown step '{}' in '{}'", step.name, description);
                    skipped.push(step.name.clone());
                }
            } else {
                let tail_type = pipeline.output_type();
                if let Some(filter) = FilterRegistry::create(&step.name, &step.options, tail_type)? {
                    pipeline.push_filter(filter);
                } else {
                    log::warn!("skipping step '{}' after the sink in '{}'", step.name, description);
                    skipped.push(step.name.clone());
                }
            }
        }

        log::info!(
            "built pipeline '{}' over {} ({} stages, {} skipped)",
            pipeline.name(),
            raw_type,
            pipeline.size(),
            skipped.len()
        );
        Ok(LenientBuild { pipeline, skipped })
    }

    /// Strict validation: every step resolves in role order and the parse
    /// reproduces the description byte for byte.
    pub fn can_be_built_from(description: &str) -> bool {
        let Ok(steps) = parse_by(description, STEP_SEPARATOR) else {
            return false;
        };
        if !reproduces(&steps, description) {
            return false;
        }

        let mut sink_placed = false;
        steps.iter().all(|step| {
            if FilterRegistry::has(&step.name) {
                true
            } else if !sink_placed && SinkRegistry::has(&step.name) {
                sink_placed = true;
                true
            } else {
                false
            }
        })
    }

    /// Builds strictly: unknown steps and almost-valid descriptions are errors.
    pub fn parse(description: &str, raw_type: ElementType) -> Result<Pipeline, PipelineError> {
        let build = Self::from_string(description, raw_type)?;
        if !build.skipped.is_empty() {
            return Err(PipelineError::UnknownStages(build.skipped));
        }
        if !Self::can_be_built_from(description) {
            return Err(PipelineError::Parse {
                input: description.to_string(),
                position: 0,
                reason: "description does not re-serialize to itself".into(),
            });
        }
        Ok(build.pipeline)
    }

    /// Rebuilds the pipeline that produced `bytes` from its container header.
    pub fn bootstrap(bytes: &[u8]) -> Result<Pipeline, PipelineError> {
        let header = Header::from_bytes(bytes)?;
        Self::parse(header.pipeline(), header.element_type())
    }
}
