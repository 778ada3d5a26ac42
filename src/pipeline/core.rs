//! The `Pipeline` composition root: stage ownership, validation, sizing and the
//! end-to-end encode/decode protocol around the container header.

use crate::error::{DecodeStatus, PipelineError, Segment, StageFailure};
use crate::parser::STEP_SEPARATOR;
use crate::pipeline::chain::StageChain;
use crate::pipeline::header::Header;
use crate::stages::{FilterKind, Sink, SinkKind, Stage};
use crate::types::ElementType;
use crate::utils::{clean_number_of_threads, element_count, ScratchBuffer};

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub(crate) raw_type: ElementType,
    pub(crate) head: StageChain,
    pub(crate) sink: Option<SinkKind>,
    pub(crate) tail: StageChain,
    n_threads: usize,
}

impl Pipeline {
    //==============================================================================
    // Composition
    //==============================================================================

    /// An empty pipeline over `raw_type`.
    pub fn new(raw_type: ElementType) -> Self {
        Self {
            raw_type,
            head: StageChain::new(Segment::Head),
            sink: None,
            tail: StageChain::new(Segment::Tail),
            n_threads: 1,
        }
    }

    /// Appends a filter to the head chain, or to the tail chain once a sink is set.
    pub fn push_filter(&mut self, filter: FilterKind) {
        if self.sink.is_none() {
            self.head.push(filter);
        } else {
            self.tail.push(filter);
        }
    }

    pub fn set_sink(&mut self, mut sink: SinkKind) {
        sink.set_n_threads(self.n_threads);
        self.sink = Some(sink);
    }

    pub fn head(&self) -> &StageChain {
        &self.head
    }

    pub fn sink(&self) -> Option<&SinkKind> {
        self.sink.as_ref()
    }

    pub fn tail(&self) -> &StageChain {
        &self.tail
    }

    /// Number of stages across head, sink and tail.
    pub fn size(&self) -> usize {
        self.head.len() + usize::from(self.sink.is_some()) + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn clear(&mut self) {
        self.head.clear();
        self.sink = None;
        self.tail.clear();
    }

    /// `head->sink(config)->tail`, skipping empty segments.
    pub fn name(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if !self.head.is_empty() {
            parts.push(self.head.name());
        }
        if let Some(sink) = &self.sink {
            parts.push(sink.descriptor());
        }
        if !self.tail.is_empty() {
            parts.push(self.tail.name());
        }
        parts.join(STEP_SEPARATOR)
    }

    pub fn input_type(&self) -> ElementType {
        self.raw_type
    }

    pub fn output_type(&self) -> ElementType {
        self.sink
            .as_ref()
            .map(|s| s.output_type())
            .unwrap_or(self.raw_type)
    }

    pub fn is_compressor(&self) -> bool {
        self.sink.is_some()
    }

    /// Checks adjacency inside both chains and across the sink boundaries.
    ///
    /// This is a pre-flight check; encode and decode do not repeat it.
    pub fn valid_filters(&self) -> bool {
        if !self.head.valid() || !self.tail.valid() {
            return false;
        }
        if let Some(t) = self.head.input_type() {
            if t != self.raw_type {
                return false;
            }
        }
        let head_out = self.head.output_type().unwrap_or(self.raw_type);
        match &self.sink {
            Some(sink) => {
                let tail_ok = self
                    .tail
                    .input_type()
                    .map_or(true, |t| t == sink.output_type());
                head_out == sink.input_type() && tail_ok
            }
            None => self.tail.is_empty(),
        }
    }

    //==============================================================================
    // Sizing & Threads
    //==============================================================================

    /// Upper bound on the bytes `encode` writes for `bytes_in` raw bytes, header
    /// included. The header bound counts twice, leaving room for a header
    /// rewritten once the payload size is known.
    pub fn max_encoded_size(&self, bytes_in: usize) -> usize {
        let header = Header::max_len(self.name().len());
        let sink = self
            .sink
            .as_ref()
            .map(|s| s.max_encoded_size(bytes_in))
            .unwrap_or(0);
        // Without a sink the payload is the (size preserving) filtered raw data.
        let stored_raw = if self.sink.is_none() { bytes_in } else { 0 };
        let payload = self
            .head
            .max_encoded_size(bytes_in)
            .max(sink)
            .max(self.tail.max_encoded_size(bytes_in))
            .max(stored_raw);
        2 * header + payload
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Clamps the hint and forwards it to every stage.
    pub fn set_n_threads(&mut self, n_threads: usize) {
        self.n_threads = clean_number_of_threads(n_threads);
        self.head.set_n_threads(self.n_threads);
        if let Some(sink) = &mut self.sink {
            sink.set_n_threads(self.n_threads);
        }
        self.tail.set_n_threads(self.n_threads);
    }

    //==============================================================================
    // Encode
    //==============================================================================

    /// Encodes `input` (elements of the raw type laid out as `shape`) into
    /// `output`, which must hold at least `max_encoded_size` bytes. Returns the
    /// total bytes written, header included.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8], shape: &[usize]) -> Result<usize, PipelineError> {
        let n_elements = element_count(shape);
        if n_elements == 0 {
            return Err(PipelineError::EmptyInput);
        }
        let raw_bytes = n_elements * self.raw_type.width();
        if input.len() < raw_bytes {
            return Err(PipelineError::InvalidShape(format!(
                "shape {:?} of {} needs {} bytes, input has {}",
                shape,
                self.raw_type,
                raw_bytes,
                input.len()
            )));
        }
        let input = &input[..raw_bytes];

        let max_size = self.max_encoded_size(raw_bytes);
        if output.len() < max_size {
            return Err(PipelineError::OutputTooSmall {
                needed: max_size,
                available: output.len(),
            });
        }

        // The scratch allocation overlaps header construction and is joined
        // before any stage runs.
        let scratch_len = max_size.max(raw_bytes);
        let raw_type = self.raw_type;
        let name = self.name();
        let (header, scratch) = std::thread::scope(|s| {
            let pending = s.spawn(move || ScratchBuffer::zeroed(scratch_len));
            let header = Header::new(raw_type, shape, &name);
            (header, pending.join())
        });
        let mut header = header?;
        let mut scratch = scratch
            .map_err(|_| PipelineError::InternalError("scratch allocation thread panicked".into()))?;

        // Stage names are fixed at build time, so the header length is known
        // before the payload is written.
        let header_len = header.len();
        let payload_len = self.detail_encode(
            input,
            &mut output[header_len..],
            shape,
            scratch.as_mut_slice(),
        )?;

        header.set_compressed_size(payload_len);
        output[..header_len].copy_from_slice(&header.to_bytes());

        let total = header_len + payload_len;
        log_metric!(
            "event" = "encode",
            "pipeline" = header.pipeline(),
            "raw_bytes" = raw_bytes,
            "encoded_bytes" = total,
            "ratio" = format!("{:.3}", raw_bytes as f64 / total as f64)
        );
        Ok(total)
    }

    /// Runs head, sink and tail. `payload` is the output after the header,
    /// `scratch` the pipeline's own buffer. Returns the payload length.
    fn detail_encode(
        &mut self,
        input: &[u8],
        payload: &mut [u8],
        shape: &[usize],
        scratch: &mut [u8],
    ) -> Result<usize, PipelineError> {
        // Head chain: result lands in `scratch`, `payload` serves as its ping-pong buffer.
        let head_len = if self.head.is_empty() {
            None
        } else {
            Some(self.head.encode_with_scratch(input, scratch, shape, payload)?)
        };

        let Some(sink) = self.sink.as_mut() else {
            let (src, n) = match head_len {
                Some(n) => (&scratch[..n], n),
                None => (input, input.len()),
            };
            payload[..n].copy_from_slice(src);
            return Ok(n);
        };

        let sink_in: &[u8] = match head_len {
            Some(n) => &scratch[..n],
            None => input,
        };
        let compressed = match sink.encode(sink_in, payload, shape) {
            Some(n) if n > 0 => n,
            _ => {
                return Err(PipelineError::StageFailed {
                    segment: Segment::Sink,
                    position: 0,
                    stage: sink.descriptor(),
                })
            }
        };
        if compressed > payload.len() {
            return Err(PipelineError::BufferOverrun {
                stage: sink.descriptor(),
                written: compressed,
                capacity: payload.len(),
            });
        }
        log::debug!("sink '{}': {} -> {} bytes", sink.name(), sink_in.len(), compressed);

        if self.tail.is_empty() {
            return Ok(compressed);
        }

        // The tail sees bytes; a full-size shape only survives if nothing shrank.
        let tail_shape = if compressed == element_count(shape) {
            shape.to_vec()
        } else {
            vec![compressed]
        };
        let n = self.tail.encode(&payload[..compressed], scratch, &tail_shape)?;
        if n > payload.len() {
            return Err(PipelineError::BufferOverrun {
                stage: self.tail.name(),
                written: n,
                capacity: payload.len(),
            });
        }
        payload[..n].copy_from_slice(&scratch[..n]);
        Ok(n)
    }

    /// Allocates a buffer of `max_encoded_size` bytes, encodes and trims it.
    pub fn encode_to_vec(&mut self, input: &[u8], shape: &[usize]) -> Result<Vec<u8>, PipelineError> {
        let raw_bytes = element_count(shape) * self.raw_type.width();
        let mut output = vec![0u8; self.max_encoded_size(raw_bytes)];
        let n = self.encode(input, &mut output, shape)?;
        output.truncate(n);
        Ok(output)
    }

    //==============================================================================
    // Decode
    //==============================================================================

    /// Decodes a buffer produced by `encode` into `output`, taking the shape from
    /// the embedded header.
    pub fn decode(&self, input: &[u8], output: &mut [u8]) -> Result<(), PipelineError> {
        self.decode_with_shape(input, output, None)
    }

    /// Decodes with an explicit output shape instead of the header's.
    ///
    /// Stage failures surface as `PipelineError::DecodeFailed`, whose `code()` is
    /// the banded status: tail failures raw, sink `10 + code`, head `100 + code`.
    pub fn decode_with_shape(
        &self,
        input: &[u8],
        output: &mut [u8],
        out_shape: Option<&[usize]>,
    ) -> Result<(), PipelineError> {
        let header = Header::from_bytes(input)?;
        if header.element_type() != self.raw_type {
            return Err(PipelineError::UnsupportedType(format!(
                "buffer holds {}, pipeline decodes {}",
                header.element_type(),
                self.raw_type
            )));
        }
        let payload = header.payload(input)?;
        let out_shape = out_shape.unwrap_or(header.shape());
        let out_bytes = element_count(out_shape) * self.raw_type.width();
        if output.len() < out_bytes {
            return Err(PipelineError::OutputTooSmall {
                needed: out_bytes,
                available: output.len(),
            });
        }
        if self.sink.is_none() && payload.len() != out_bytes {
            return Err(PipelineError::HeaderFormat(format!(
                "uncompressed payload of {} bytes cannot fill {} bytes",
                payload.len(),
                out_bytes
            )));
        }

        let status = self.detail_decode(payload, &mut output[..out_bytes], out_shape);
        if status.is_ok() {
            Ok(())
        } else {
            log::error!("decoding '{}' failed: {}", self.name(), status);
            Err(PipelineError::DecodeFailed(status))
        }
    }

    fn detail_decode(&self, payload: &[u8], output: &mut [u8], out_shape: &[usize]) -> DecodeStatus {
        let mut status = DecodeStatus::ok();
        let mut temp = vec![0u8; output.len()];

        match &self.sink {
            Some(sink) => {
                let tail_out: Vec<u8>;
                let sink_in: &[u8] = if self.tail.is_empty() {
                    payload
                } else {
                    let mut buf = vec![0u8; payload.len()];
                    let tail_shape = [payload.len()];
                    status.absorb(self.tail.decode(payload, &mut buf, &tail_shape, &tail_shape), 0);
                    tail_out = buf;
                    &tail_out
                };
                if let Err(code) = sink.decode(sink_in, &mut temp, &[sink_in.len()], out_shape) {
                    status.record(
                        StageFailure {
                            segment: Segment::Sink,
                            position: 0,
                            stage: sink.descriptor(),
                            code,
                        },
                        10 + code,
                    );
                }
            }
            None => temp.copy_from_slice(payload),
        }

        if self.head.is_empty() {
            output.copy_from_slice(&temp);
        } else {
            status.absorb(self.head.decode(&temp, output, out_shape, out_shape), 100);
        }
        status
    }

    /// Decodes a buffer into a freshly allocated vector sized from its header.
    ///
    /// # Errors
    /// `HeaderFormat` if the announced size cannot come from the payload present,
    /// or cannot be allocated.
    pub fn decode_to_vec(&self, input: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let header = Header::from_bytes(input)?;
        let payload_len = header.payload(input)?.len();
        let raw_size = header.raw_size();
        // SECURITY: Never size an allocation from an unchecked header field.
        if raw_size > self.max_decoded_size(payload_len) {
            return Err(PipelineError::HeaderFormat(format!(
                "{} payload bytes cannot decode to {} bytes through '{}'",
                payload_len,
                raw_size,
                self.name()
            )));
        }
        let mut output = Vec::new();
        output.try_reserve_exact(raw_size).map_err(|e| {
            PipelineError::HeaderFormat(format!("cannot allocate {} bytes: {}", raw_size, e))
        })?;
        output.resize(raw_size, 0);
        self.decode(input, &mut output)?;
        Ok(output)
    }

    /// Largest raw byte count a payload of `payload_len` bytes can decode to.
    /// Filters preserve size, so only the sink can expand.
    pub fn max_decoded_size(&self, payload_len: usize) -> usize {
        self.sink
            .as_ref()
            .map_or(payload_len, |s| s.max_decoded_size(payload_len))
    }

    //==============================================================================
    // Header queries
    //==============================================================================

    /// Raw byte size recorded in the header of an encoded buffer.
    pub fn decoded_size(encoded: &[u8]) -> Result<usize, PipelineError> {
        Ok(Header::from_bytes(encoded)?.raw_size())
    }

    pub fn decoded_shape(encoded: &[u8]) -> Result<Vec<usize>, PipelineError> {
        Ok(Header::from_bytes(encoded)?.shape().to_vec())
    }

    pub fn decoded_type(encoded: &[u8]) -> Result<ElementType, PipelineError> {
        Ok(Header::from_bytes(encoded)?.element_type())
    }
}
