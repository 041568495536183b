//! Implementations for the ReferenceController state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::{AlignmentState, FeedbackController, RefCtrlError, RefCtrlOptions, SwerveReference};
use crate::drive::DriveSubsystem;
use drive_if::FieldRelativeVelocity;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plays back one reference through a drive.
///
/// Single use: a new playback needs a new instance.
pub struct ReferenceController<C, R> {
    controller: C,
    reference: R,
    options: RefCtrlOptions,

    alignment: AlignmentState,

    /// Timestamp of the latest measurement.
    ///
    /// Units: seconds
    last_timestamp_s: f64,

    report: StatusReport,
}

/// Status report for reference control processing.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct StatusReport {
    pub alignment: AlignmentState,

    /// The velocity computed on the latest execution.
    pub target: FieldRelativeVelocity,

    /// True if the latest execution drove rather than steering at rest.
    pub driving: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C, R> ReferenceController<C, R>
where
    C: FeedbackController,
    R: SwerveReference,
{
    /// Begin a playback from the drive's live state.
    ///
    /// Must be called on the tick playback starts, after the drive's `periodic`.
    pub fn new<D: DriveSubsystem>(
        drive: &mut D,
        mut controller: C,
        mut reference: R,
        options: RefCtrlOptions,
    ) -> Result<Self, RefCtrlError> {
        let measurement = drive.state()?;

        controller.reset();

        // A platform which is already moving does not stop to steer
        let alignment = if !options.steer_at_rest || measurement.velocity.norm() > 0.0 {
            AlignmentState::Aligned
        } else {
            AlignmentState::NotAligned
        };

        reference.initialize(&measurement);
        drive.reset_limiter();

        info!(
            "Reference playback started at {:.3} s ({:?}, {:?})",
            measurement.timestamp_s, alignment, options
        );

        Ok(Self {
            controller,
            reference,
            options,
            alignment,
            last_timestamp_s: measurement.timestamp_s,
            report: StatusReport {
                alignment,
                target: FieldRelativeVelocity::zero(),
                driving: false,
            },
        })
    }

    /// Execute one tick of playback.
    ///
    /// If the drive's state is unavailable the drive is stopped and the error returned.
    pub fn execute<D: DriveSubsystem>(&mut self, drive: &mut D) -> Result<(), RefCtrlError> {
        let measurement = match drive.state() {
            Ok(m) => m,
            Err(e) => {
                drive.stop();
                return Err(e.into());
            }
        };
        let now_s = measurement.timestamp_s;
        self.last_timestamp_s = now_s;

        // Hold the reference at its start until the wheels are ready
        if self.alignment == AlignmentState::NotAligned {
            self.reference.initialize(&measurement);
        }

        let current = self.reference.current(now_s);
        let next = self.reference.next(now_s);
        let target = self.controller.calculate(&measurement, &current, &next);

        if self.alignment == AlignmentState::NotAligned && drive.aligned(target) {
            debug!("Modules aligned at {:.3} s", now_s);
            self.alignment = AlignmentState::Aligned;
        }

        match self.alignment {
            AlignmentState::NotAligned => drive.steer_at_rest(target),
            AlignmentState::Aligned if self.options.verbatim => {
                drive.drive_in_field_coords_verbatim(target)
            }
            AlignmentState::Aligned => drive.drive_in_field_coords(target),
        }

        self.report = StatusReport {
            alignment: self.alignment,
            target,
            driving: self.alignment == AlignmentState::Aligned,
        };

        Ok(())
    }

    /// True once the reference has run out of time and the controller is within tolerance.
    pub fn is_finished(&self) -> bool {
        self.is_done() && self.controller.at_reference()
    }

    /// True once the reference has run out of time, regardless of tracking error.
    pub fn is_done(&self) -> bool {
        self.reference.done(self.last_timestamp_s)
    }

    pub fn at_reference(&self) -> bool {
        self.controller.at_reference()
    }

    pub fn alignment(&self) -> AlignmentState {
        self.alignment
    }

    pub fn options(&self) -> RefCtrlOptions {
        self.options
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
