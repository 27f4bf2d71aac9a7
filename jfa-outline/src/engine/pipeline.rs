//! Per-frame sequencing of the seed, jump flood and composite stages.

use bevy::log::{debug, warn_once};
use bevy::math::UVec2;

use crate::engine::composite::CompositeParams;
use crate::engine::field::FieldRecord;
use crate::engine::jump_flood::{JumpFloodDispatch, JumpSequence};
use crate::engine::settings::OutlineSettings;

/// What the pipeline needs from the renderer hosting it.
///
/// Implemented by the CPU reference backend and by the render graph node.
pub trait OutlineBackend {
    /// Handle to one field buffer.
    type Field;
    type Error;

    /// Size of the camera's active color target this invocation.
    fn target_size(&self) -> UVec2;

    /// Allocates the two field buffers, both sized like the color target.
    fn allocate_field_pair(&mut self, size: UVec2) -> [Self::Field; 2];

    /// Clears `target` to `clear` and draws the selected geometry with the
    /// seed program.
    fn rasterize_seeds(&mut self, target: &Self::Field, clear: FieldRecord)
        -> Result<(), Self::Error>;

    /// One jump flood step reading `input` and writing `output`.
    fn dispatch_jump_flood(
        &mut self,
        input: &Self::Field,
        output: &Self::Field,
        dispatch: JumpFloodDispatch,
    ) -> Result<(), Self::Error>;

    /// Blends the outline onto the camera color wherever `field` is in range.
    fn composite_outline(
        &mut self,
        field: &Self::Field,
        params: &CompositeParams,
    ) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    ComputeUnsupported,
    CameraExcluded,
    EmptySelection,
    /// The color target has a zero dimension, e.g. a minimized window.
    EmptyTarget,
}

impl SkipReason {
    pub fn report(&self) {
        match self {
            SkipReason::ComputeUnsupported => {
                warn_once!(
                    "Jump flood outline is not supported on this hardware: \
                     compute dispatch unavailable"
                )
            }
            reason => debug!("Skipping jump flood outline this frame: {:?}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skip(SkipReason),
}

/// The three per-frame conditions, checked together once per camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGate {
    pub compute_supported: bool,
    pub camera_included: bool,
    pub selection_count: usize,
}

impl FrameGate {
    /// Reports the first failing check, in hardware, camera, selection order.
    pub fn evaluate(&self) -> GateDecision {
        if !self.compute_supported {
            GateDecision::Skip(SkipReason::ComputeUnsupported)
        } else if !self.camera_included {
            GateDecision::Skip(SkipReason::CameraExcluded)
        } else if self.selection_count == 0 {
            GateDecision::Skip(SkipReason::EmptySelection)
        } else {
            GateDecision::Run
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Skipped(SkipReason),
    Completed { size: UVec2, steps: usize },
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed { .. })
    }
}

/// Runs seed rasterization, the jump flood steps and the composite in order.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOrchestrator {
    jumps: JumpSequence,
    params: CompositeParams,
}

impl PipelineOrchestrator {
    pub fn new(settings: &OutlineSettings) -> Self {
        Self {
            jumps: settings.jump_sequence(),
            params: settings.composite_params(),
        }
    }

    /// Evaluates `gate` and, if it passes, executes the whole pipeline.
    /// A skipped frame allocates nothing and issues no work.
    pub fn run<B: OutlineBackend>(
        &self,
        backend: &mut B,
        gate: &FrameGate,
    ) -> Result<PipelineOutcome, B::Error> {
        match gate.evaluate() {
            GateDecision::Run => self.execute(backend),
            GateDecision::Skip(reason) => {
                reason.report();
                Ok(PipelineOutcome::Skipped(reason))
            }
        }
    }

    pub fn execute<B: OutlineBackend>(&self, backend: &mut B) -> Result<PipelineOutcome, B::Error> {
        let size = backend.target_size();
        if size.x == 0 || size.y == 0 {
            SkipReason::EmptyTarget.report();
            return Ok(PipelineOutcome::Skipped(SkipReason::EmptyTarget));
        }

        let fields = backend.allocate_field_pair(size);
        let mut current = 0;
        backend.rasterize_seeds(&fields[current], FieldRecord::SENTINEL)?;

        let mut steps = 0;
        for jump in self.jumps {
            let next = current ^ 1;
            let dispatch = JumpFloodDispatch::new(size, jump);
            backend.dispatch_jump_flood(&fields[current], &fields[next], dispatch)?;
            current = next;
            steps += 1;
        }

        backend.composite_outline(&fields[current], &self.params)?;
        Ok(PipelineOutcome::Completed { size, steps })
    }

    pub fn params(&self) -> &CompositeParams {
        &self.params
    }

    pub fn jumps(&self) -> JumpSequence {
        self.jumps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(compute_supported: bool, camera_included: bool, selection_count: usize) -> FrameGate {
        FrameGate {
            compute_supported,
            camera_included,
            selection_count,
        }
    }

    #[test]
    fn gate_reports_first_failing_check() {
        assert_eq!(gate(true, true, 3).evaluate(), GateDecision::Run);
        assert_eq!(
            gate(false, false, 0).evaluate(),
            GateDecision::Skip(SkipReason::ComputeUnsupported)
        );
        assert_eq!(gate(true, false, 0).evaluate(), GateDecision::Skip(SkipReason::CameraExcluded));
        assert_eq!(gate(true, true, 0).evaluate(), GateDecision::Skip(SkipReason::EmptySelection));
    }

    /// Records the call sequence; fields are plain indices.
    #[derive(Default)]
    struct CallLog {
        size: UVec2,
        calls: Vec<String>,
    }

    impl OutlineBackend for CallLog {
        type Field = usize;
        type Error = ();

        fn target_size(&self) -> UVec2 {
            self.size
        }

        fn allocate_field_pair(&mut self, _size: UVec2) -> [usize; 2] {
            self.calls.push("allocate".into());
            [0, 1]
        }

        fn rasterize_seeds(&mut self, target: &usize, _clear: FieldRecord) -> Result<(), ()> {
            self.calls.push(format!("seed->{target}"));
            Ok(())
        }

        fn dispatch_jump_flood(
            &mut self,
            input: &usize,
            output: &usize,
            dispatch: JumpFloodDispatch,
        ) -> Result<(), ()> {
            assert_ne!(input, output);
            self.calls.push(format!("step{} {input}->{output}", dispatch.jump));
            Ok(())
        }

        fn composite_outline(
            &mut self,
            field: &usize,
            _params: &CompositeParams,
        ) -> Result<(), ()> {
            self.calls.push(format!("composite<-{field}"));
            Ok(())
        }
    }

    fn settings(width_px: f32) -> OutlineSettings {
        OutlineSettings {
            layer_mask: crate::engine::seed::LayerMask::layer(0),
            width_px,
            color: [0.0, 0.0, 1.0, 1.0],
            camera_filter: Default::default(),
        }
    }

    #[test]
    fn stages_run_in_order_and_ping_pong() {
        let mut backend = CallLog {
            size: UVec2::new(16, 16),
            ..Default::default()
        };
        let outcome = PipelineOrchestrator::new(&settings(8.0)).execute(&mut backend).unwrap();

        assert_eq!(outcome, PipelineOutcome::Completed { size: UVec2::new(16, 16), steps: 3 });
        assert_eq!(
            backend.calls,
            vec!["allocate", "seed->0", "step4 0->1", "step2 1->0", "step1 0->1", "composite<-1"]
        );
    }

    #[test]
    fn orchestrator_takes_jumps_and_params_from_settings() {
        let settings = settings(5.0);
        let orchestrator = PipelineOrchestrator::new(&settings);

        assert_eq!(orchestrator.jumps().collect::<Vec<_>>(), vec![4, 2, 1]);
        assert_eq!(orchestrator.jumps().reach(), 7);
        assert_eq!(orchestrator.params(), &settings.composite_params());
        assert_eq!(orchestrator.params().width_px, 5.0);
    }

    #[test]
    fn skipped_gate_issues_no_work() {
        let mut backend = CallLog {
            size: UVec2::new(4, 4),
            ..Default::default()
        };
        let outcome = PipelineOrchestrator::new(&settings(4.0))
            .run(&mut backend, &gate(true, true, 0))
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::Skipped(SkipReason::EmptySelection));
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn zero_sized_target_is_skipped_before_allocation() {
        let mut backend = CallLog {
            size: UVec2::new(0, 720),
            ..Default::default()
        };
        let outcome = PipelineOrchestrator::new(&settings(4.0))
            .run(&mut backend, &gate(true, true, 1))
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::Skipped(SkipReason::EmptyTarget));
        assert!(backend.calls.is_empty());
    }
}
