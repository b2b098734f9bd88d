//! Step observers injected into compactors
//!
//! Compactors report every step to an [`Observer`] handed to them at
//! construction, so diagnostics never depend on global state.

use crate::core::checksum::render;
use crate::core::compactor::StepEvent;
use crate::core::list::ExtentList;
use tracing::trace;

/// Receives one callback per compaction step, after the step is applied
pub trait Observer {
    fn on_step(&mut self, event: &StepEvent, list: &ExtentList);
}

/// Observer that ignores every step
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_step(&mut self, _event: &StepEvent, _list: &ExtentList) {}
}

/// Observer that emits a `trace` event per step
#[derive(Debug, Clone)]
pub struct TracingObserver {
    render_layout: bool,
    free_glyph: char,
}

impl TracingObserver {
    pub fn new(render_layout: bool, free_glyph: char) -> Self {
        TracingObserver {
            render_layout,
            free_glyph,
        }
    }
}

impl Observer for TracingObserver {
    fn on_step(&mut self, event: &StepEvent, list: &ExtentList) {
        if self.render_layout {
            trace!(
                "{:?}: {}",
                event,
                render(list, self.free_glyph)
            );
        } else {
            trace!("{:?}", event);
        }
    }
}

/// Observer that keeps every event, in order
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Vec<StepEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for RecordingObserver {
    fn on_step(&mut self, event: &StepEvent, _list: &ExtentList) {
        self.events.push(*event);
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_step(&mut self, event: &StepEvent, list: &ExtentList) {
        (**self).on_step(event, list);
    }
}
