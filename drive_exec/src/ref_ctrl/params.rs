//! Reference control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::RefCtrlOptions;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for reference control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Translation controller proportional gain, applied to each of X and Y
    pub trans_k_p: f64,

    /// Translation controller integral gain
    pub trans_k_i: f64,

    /// Translation controller derivative gain
    pub trans_k_d: f64,

    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Gain on the error between reference and measured velocity
    pub vel_k: f64,

    /// Position error under which the reference is considered reached
    ///
    /// Units: meters
    pub pos_tolerance_m: f64,

    /// Units: radians
    pub head_tolerance_rad: f64,

    /// Units: meters/second
    pub vel_tolerance_ms: f64,

    /// Units: radians/second
    pub omega_tolerance_rads: f64,

    /// How far ahead of the current reference to sample for feedforward
    ///
    /// Units: seconds
    pub lookahead_s: f64,

    /// Steer the wheels at rest before driving
    #[serde(default = "default_steer_at_rest")]
    pub steer_at_rest: bool,

    /// Skip driver skill scaling and limiting
    #[serde(default)]
    pub verbatim: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// The playback options these parameters select.
    pub fn options(&self) -> RefCtrlOptions {
        RefCtrlOptions {
            verbatim: self.verbatim,
            steer_at_rest: self.steer_at_rest,
        }
    }
}

fn default_steer_at_rest() -> bool {
    true
}
