//! Frame to symbol stream sequencing.
//!
//! The sequencer walks a latched [Frame] one symbol per encoder request. Producers place the
//! next frame in a single-slot mailbox with [FrameSequencer::offer]; the mailbox is only read at
//! a latch boundary, which is signaled by a one-tick `frame_latched` pulse. Offering a frame
//! right after that pulse gives the producer a full frame period to prepare the next one.
//!
//! ```text
//!                 _____________________________________________________________
//! pending frame   _X___________X___________X___________X___________X__________X
//!                  _           _           _           _           _          _
//! frame_latched   | |_________| |_________| |_________| |_________| |________| |_
//! ```
use tracing::trace;

use crate::prelude::*;
use crate::symbol::Symbol;
use crate::timecode::Frame;

/// Bootstrap phase of a [FrameSequencer].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Sending the bootstrap marker, waiting for the first request.
    AwaitingFirstMarker,
    /// Latching the first frame from the mailbox.
    LatchingFirstFrame,
    Streaming,
}

/// Output of one sequencer tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequencerOutput {
    /// Symbol to encode for the current bit period.
    pub symbol: Symbol,
    /// High for one tick when the mailbox frame was latched.
    pub frame_latched: bool,
}

/// Clocked state machine producing the symbol stream for consecutive frames.
///
/// The very first two symbols after enable or reset are both markers: a bootstrap marker
/// followed by the reference marker of the first frame. Downstream receivers can use the
/// double marker to find the start of a frame, as they do at every following frame boundary
/// where the last marker of a frame is followed by the reference marker of the next.
#[derive(Clone, Debug)]
pub struct FrameSequencer {
    width: usize,
    index: usize,
    phase: Phase,
    latched: Option<Frame>,
    pending: Option<Frame>,
    frame_latched: bool,
}

impl FrameSequencer {
    /// # Panics
    /// If `frame_width` is not 60 or 100.
    #[must_use]
    pub fn new(frame_width: usize) -> Self {
        assert!(
            Frame::WIDTHS.contains(&frame_width),
            "frame width must be 60 or 100; got {frame_width}"
        );
        FrameSequencer {
            width: frame_width,
            index: 0,
            phase: Phase::AwaitingFirstMarker,
            latched: None,
            pending: None,
            frame_latched: false,
        }
    }

    /// Place `frame` in the mailbox, replacing any frame not yet latched.
    ///
    /// # Errors
    /// [Error::MalformedFrame] if the frame width does not match this sequencer.
    pub fn offer(&mut self, frame: Frame) -> Result<()> {
        if frame.width() != self.width {
            return Err(Error::MalformedFrame(format!(
                "sequencer expects {} symbol frames; got {}",
                self.width,
                frame.width()
            )));
        }
        self.pending = Some(frame);
        Ok(())
    }

    /// Advance one tick, consuming `request` from the encoder.
    ///
    /// While disabled the index and latched frame are frozen. The latching tick directly follows
    /// a consumed request, so a request on that tick is not expected and is ignored.
    pub fn tick(&mut self, enable: bool, request: bool) -> SequencerOutput {
        self.frame_latched = false;
        if !enable {
            return self.output();
        }

        match self.phase {
            Phase::AwaitingFirstMarker => {
                self.index = 0;
                if request {
                    self.phase = Phase::LatchingFirstFrame;
                }
            }
            Phase::LatchingFirstFrame => {
                self.latch();
                self.index = 0;
                self.phase = Phase::Streaming;
            }
            Phase::Streaming => {
                if request {
                    self.advance();
                }
            }
        }

        self.output()
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % self.width;
        if self.index == 0 {
            self.latch();
        }
    }

    fn latch(&mut self) {
        if self.pending.is_some() {
            self.latched.clone_from(&self.pending);
        }
        self.frame_latched = true;
        trace!(
            phase = ?self.phase,
            frame = ?self.latched.as_ref().map(ToString::to_string),
            "latched frame"
        );
    }

    /// Return to [Phase::AwaitingFirstMarker], dropping the latched frame. The mailbox is
    /// kept.
    pub fn reset(&mut self) {
        self.index = 0;
        self.phase = Phase::AwaitingFirstMarker;
        self.latched = None;
        self.frame_latched = false;
    }

    /// Symbol for the current index: a marker at marker positions, otherwise the latched
    /// frame's data bit.
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        if Frame::is_marker_position(self.index) {
            return Symbol::Marker;
        }
        let bit = self
            .latched
            .as_ref()
            .is_some_and(|frame| frame.bit(self.index));
        Symbol::from_bit(bit)
    }

    #[must_use]
    pub fn output(&self) -> SequencerOutput {
        SequencerOutput {
            symbol: self.symbol(),
            frame_latched: self.frame_latched,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame currently being sequenced.
    #[must_use]
    pub fn latched(&self) -> Option<&Frame> {
        self.latched.as_ref()
    }

    /// Frame waiting in the mailbox.
    #[must_use]
    pub fn pending(&self) -> Option<&Frame> {
        self.pending.as_ref()
    }
}
