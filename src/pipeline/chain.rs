//! An ordered sequence of filters that encodes and decodes as a unit.
//!
//! Encoding ping-pongs between the caller's output and one scratch buffer. The
//! buffer holding the latest result is tracked explicitly in [`Location`], so the
//! final copy into the caller's output depends on where the last write landed and
//! not on loop arithmetic.

use crate::error::{DecodeStatus, PipelineError, Segment, StageFailure};
use crate::stages::{Filter, FilterKind, Stage};
use crate::types::ElementType;
use crate::utils::clean_number_of_threads;

/// Where the most recent stage output lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Input,
    Output,
    Scratch,
}

#[derive(Debug, Clone)]
pub struct StageChain<F: Filter = FilterKind> {
    stages: Vec<F>,
    segment: Segment,
    n_threads: usize,
}

impl<F: Filter> Default for StageChain<F> {
    fn default() -> Self {
        Self::new(Segment::Head)
    }
}

impl<F: Filter> StageChain<F> {
    pub fn new(segment: Segment) -> Self {
        Self {
            stages: Vec::new(),
            segment,
            n_threads: 1,
        }
    }

    pub fn from_stages(segment: Segment, stages: Vec<F>) -> Self {
        let mut chain = Self::new(segment);
        for stage in stages {
            chain.push(stage);
        }
        chain
    }

    /// Appends a stage, handing it the chain's current thread hint.
    pub fn push(&mut self, mut stage: F) {
        stage.set_n_threads(self.n_threads);
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    pub fn stages(&self) -> &[F] {
        &self.stages
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// `->`-joined, option-annotated names of the members.
    pub fn name(&self) -> String {
        self.stages
            .iter()
            .map(|s| s.descriptor())
            .collect::<Vec<_>>()
            .join(crate::parser::STEP_SEPARATOR)
    }

    /// True if every stage's output type equals the next stage's input type.
    pub fn valid(&self) -> bool {
        self.stages
            .windows(2)
            .all(|pair| pair[0].output_type() == pair[1].input_type())
    }

    pub fn input_type(&self) -> Option<ElementType> {
        self.stages.first().map(|s| s.input_type())
    }

    pub fn output_type(&self) -> Option<ElementType> {
        self.stages.last().map(|s| s.output_type())
    }

    /// The largest bound any member reports for `bytes_in`; 0 for an empty chain.
    pub fn max_encoded_size(&self, bytes_in: usize) -> usize {
        self.stages
            .iter()
            .map(|s| s.max_encoded_size(bytes_in))
            .max()
            .unwrap_or(0)
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    pub fn set_n_threads(&mut self, n_threads: usize) {
        self.n_threads = clean_number_of_threads(n_threads);
        for stage in &mut self.stages {
            stage.set_n_threads(self.n_threads);
        }
    }

    /// Encodes `input` through every stage into `output` using a scratch buffer
    /// sized to the chain's bound. Returns the bytes written to `output`.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8], shape: &[usize]) -> Result<usize, PipelineError> {
        let mut scratch = vec![0u8; self.max_encoded_size(input.len()).max(input.len())];
        self.encode_with_scratch(input, output, shape, &mut scratch)
    }

    /// Like [`encode`](Self::encode), ping-ponging through the caller's `scratch`.
    pub fn encode_with_scratch(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        shape: &[usize],
        scratch: &mut [u8],
    ) -> Result<usize, PipelineError> {
        let capacity = if self.stages.len() > 1 {
            output.len().min(scratch.len())
        } else {
            output.len()
        };

        let mut len = input.len();
        let mut at = Location::Input;
        for (position, stage) in self.stages.iter_mut().enumerate() {
            let (written, next) = match at {
                Location::Input => (stage.encode(input, output, shape), Location::Output),
                Location::Output => (stage.encode(&output[..len], scratch, shape), Location::Scratch),
                Location::Scratch => (stage.encode(&scratch[..len], output, shape), Location::Output),
            };
            let written = match written {
                Some(n) if n > 0 || len == 0 => n,
                _ => {
                    return Err(PipelineError::StageFailed {
                        segment: self.segment,
                        position,
                        stage: stage.descriptor(),
                    })
                }
            };
            if written > capacity {
                return Err(PipelineError::BufferOverrun {
                    stage: stage.descriptor(),
                    written,
                    capacity,
                });
            }
            log::debug!("{} #{} '{}': {} -> {} bytes", self.segment, position, stage.name(), len, written);
            len = written;
            at = next;
        }

        match at {
            Location::Output => {}
            Location::Scratch => output[..len].copy_from_slice(&scratch[..len]),
            Location::Input => {
                if output.len() < len {
                    return Err(PipelineError::OutputTooSmall {
                        needed: len,
                        available: output.len(),
                    });
                }
                output[..len].copy_from_slice(input);
            }
        }
        Ok(len)
    }

    /// Decodes `input` into `output` walking the stages in reverse.
    ///
    /// `output.len()` is the decoded byte count. Stages are weighted by their step
    /// in the decode walk: the last stage runs first and contributes `10 + code`,
    /// the one before it `20 + code`, and so on. The walk continues past failures
    /// so all of them are reported.
    pub fn decode(
        &self,
        input: &[u8],
        output: &mut [u8],
        in_shape: &[usize],
        out_shape: &[usize],
    ) -> DecodeStatus {
        let mut status = DecodeStatus::ok();
        if self.stages.is_empty() {
            let n = input.len().min(output.len());
            output[..n].copy_from_slice(&input[..n]);
            return status;
        }

        let mut scratch = vec![0u8; input.len().max(output.len())];
        scratch[..input.len()].copy_from_slice(input);
        let mut len = input.len();
        let out_len = output.len();

        let n_stages = self.stages.len();
        for (position, stage) in self.stages.iter().enumerate().rev() {
            if let Err(code) = stage.decode(&scratch[..len], output, in_shape, out_shape) {
                let step = n_stages - 1 - position;
                let weighted = 10 * (step as i32 + 1) + code;
                status.record(
                    StageFailure {
                        segment: self.segment,
                        position,
                        stage: stage.descriptor(),
                        code,
                    },
                    weighted,
                );
            }
            scratch[..out_len].copy_from_slice(output);
            len = out_len;
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds one to every byte; decoding subtracts it again.
    struct AddOne(ElementType);
    /// Reverses the buffer, which is its own inverse.
    struct Square(ElementType);
    /// Fails on every call.
    struct Broken(ElementType);
    /// Claims to have written more than it could.
    struct Liar(ElementType);

    macro_rules! test_stage {
        ($($t:ident => $name:expr),+) => {
            $(
                impl Stage for $t {
                    fn name(&self) -> &str {
                        $name
                    }
                    fn config(&self) -> String {
                        String::new()
                    }
                    fn input_type(&self) -> ElementType {
                        self.0
                    }
                    fn output_type(&self) -> ElementType {
                        self.0
                    }
                    fn max_encoded_size(&self, bytes_in: usize) -> usize {
                        bytes_in
                    }
                    fn n_threads(&self) -> usize {
                        1
                    }
                    fn set_n_threads(&mut self, _n: usize) {}
                }
            )+
        };
    }

    test_stage!(AddOne => "add_one", Square => "square", Broken => "broken", Liar => "liar");

    impl Filter for AddOne {
        fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
            for (o, i) in output.iter_mut().zip(input) {
                *o = i.wrapping_add(1);
            }
            Some(input.len())
        }
        fn decode(&self, input: &[u8], output: &mut [u8], _i: &[usize], _o: &[usize]) -> Result<(), i32> {
            for (o, i) in output.iter_mut().zip(input) {
                *o = i.wrapping_sub(1);
            }
            Ok(())
        }
    }

    impl Filter for Square {
        fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
            output[..input.len()].copy_from_slice(input);
            output[..input.len()].reverse();
            Some(input.len())
        }
        fn decode(&self, input: &[u8], output: &mut [u8], _i: &[usize], _o: &[usize]) -> Result<(), i32> {
            output[..input.len()].copy_from_slice(input);
            output[..input.len()].reverse();
            Ok(())
        }
    }

    impl Filter for Broken {
        fn encode(&mut self, _input: &[u8], _output: &mut [u8], _shape: &[usize]) -> Option<usize> {
            None
        }
        fn decode(&self, _input: &[u8], _output: &mut [u8], _i: &[usize], _o: &[usize]) -> Result<(), i32> {
            Err(3)
        }
    }

    impl Filter for Liar {
        fn encode(&mut self, input: &[u8], _output: &mut [u8], _shape: &[usize]) -> Option<usize> {
            Some(input.len() * 4)
        }
        fn decode(&self, _input: &[u8], _output: &mut [u8], _i: &[usize], _o: &[usize]) -> Result<(), i32> {
            Ok(())
        }
    }

    fn chain(stages: Vec<Box<dyn Filter>>) -> StageChain<Box<dyn Filter>> {
        StageChain::from_stages(Segment::Head, stages)
    }

    #[test]
    fn test_adjacency_validation() {
        let mismatched = chain(vec![
            Box::new(AddOne(ElementType::Int32)),
            Box::new(Square(ElementType::Int8)),
        ]);
        assert!(!mismatched.valid());

        let matched = chain(vec![
            Box::new(AddOne(ElementType::Int32)),
            Box::new(Square(ElementType::Int32)),
        ]);
        assert!(matched.valid());
        assert_eq!(matched.name(), "add_one->square");
        assert!(chain(vec![]).valid());
    }

    #[test]
    fn test_parity_of_final_copy() {
        let input: Vec<u8> = vec![1, 2, 3, 4];
        for n in 0..5 {
            let stages: Vec<Box<dyn Filter>> = (0..n)
                .map(|_| Box::new(AddOne(ElementType::UInt8)) as Box<dyn Filter>)
                .collect();
            let mut c = chain(stages);
            let mut out = vec![0u8; 4];
            assert_eq!(c.encode(&input, &mut out, &[4]).unwrap(), 4);
            let expected: Vec<u8> = input.iter().map(|v| v + n as u8).collect();
            assert_eq!(out, expected, "chain of {} stages", n);

            let mut back = vec![0u8; 4];
            assert!(c.decode(&out, &mut back, &[4], &[4]).is_ok());
            assert_eq!(back, input);
        }
    }

    #[test]
    fn test_reverse_order_decode() {
        let mut c = chain(vec![
            Box::new(AddOne(ElementType::UInt8)),
            Box::new(Square(ElementType::UInt8)),
            Box::new(AddOne(ElementType::UInt8)),
        ]);
        let input = vec![10u8, 20, 30];
        let mut out = vec![0u8; 3];
        c.encode(&input, &mut out, &[3]).unwrap();
        assert_eq!(out, vec![32, 22, 12]);

        let mut back = vec![0u8; 3];
        assert!(c.decode(&out, &mut back, &[3], &[3]).is_ok());
        assert_eq!(back, input);
    }

    #[test]
    fn test_failed_stage_aborts_encode() {
        let mut c = chain(vec![Box::new(AddOne(ElementType::UInt8)), Box::new(Broken(ElementType::UInt8))]);
        let mut out = vec![0u8; 4];
        let err = c.encode(&[1, 2, 3, 4], &mut out, &[4]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageFailed { position: 1, .. }
        ));
    }

    #[test]
    fn test_overrun_is_a_contract_violation() {
        let mut c = chain(vec![Box::new(Liar(ElementType::UInt8))]);
        let mut out = vec![0u8; 4];
        let err = c.encode(&[1, 2, 3, 4], &mut out, &[4]).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_decode_codes_are_position_weighted() {
        let c = chain(vec![
            Box::new(Broken(ElementType::UInt8)),
            Box::new(AddOne(ElementType::UInt8)),
            Box::new(Broken(ElementType::UInt8)),
        ]);
        let mut out = vec![0u8; 2];
        let status = c.decode(&[5, 6], &mut out, &[2], &[2]);
        // position 2 decodes first: 10 + 3; position 0 last: 30 + 3
        assert_eq!(status.code(), 13 + 33);
        let positions: Vec<usize> = status.failures().iter().map(|f| f.position).collect();
        assert_eq!(positions, vec![2, 0]);
    }

    #[test]
    fn test_decode_weight_follows_decode_order() {
        let first_failing = chain(vec![
            Box::new(Broken(ElementType::UInt8)),
            Box::new(AddOne(ElementType::UInt8)),
            Box::new(AddOne(ElementType::UInt8)),
        ]);
        let mut out = vec![0u8; 2];
        let status = first_failing.decode(&[5, 6], &mut out, &[2], &[2]);
        assert_eq!(status.code(), 33);
        assert_eq!(status.failures()[0].position, 0);

        let last_failing = chain(vec![
            Box::new(AddOne(ElementType::UInt8)),
            Box::new(AddOne(ElementType::UInt8)),
            Box::new(Broken(ElementType::UInt8)),
        ]);
        let status = last_failing.decode(&[5, 6], &mut out, &[2], &[2]);
        assert_eq!(status.code(), 13);
        assert_eq!(status.failures()[0].position, 2);
    }

    #[test]
    fn test_bound_is_max_over_members() {
        use crate::stages::{BitSwap, Delta};
        let c: StageChain = StageChain::from_stages(
            Segment::Tail,
            vec![
                FilterKind::Delta(Delta::new(ElementType::UInt8)),
                FilterKind::BitSwap(BitSwap::new(1, ElementType::UInt8).unwrap()),
            ],
        );
        assert_eq!(c.max_encoded_size(100), 100);
        assert_eq!(StageChain::<FilterKind>::new(Segment::Head).max_encoded_size(100), 0);
    }
}
