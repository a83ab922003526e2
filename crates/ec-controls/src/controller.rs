//! Binary-output feedback controller.
//!
//! Provides a PD controller with optional integral action whose output is
//! compared against a threshold to produce an on/off decision:
//!
//! ```text
//! error  = target - actual
//! output = kp*error + kd*(error - previous_error) + ki*integral
//! on     = output > threshold
//! ```
//!
//! The derivative term is per evaluation, not per second: readings arrive on
//! the bus at the publisher's interval and the controller has no clock.
//! No clamping is applied to the output.

use ec_core::ControlParameters;
use serde::{Deserialize, Serialize};

/// How the controller turns a reading into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// PD(+I) law compared against the threshold.
    #[default]
    Feedback,
    /// Plain comparison `actual <= target`, bypassing the feedback math.
    OnOff,
}

/// Result of one controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    /// `target - actual`.
    pub error: f64,
    /// Proportional term.
    pub p: f64,
    /// Integral term.
    pub i: f64,
    /// Derivative term.
    pub d: f64,
    /// `p + i + d`. Zero in [`ControlMode::OnOff`].
    pub output: f64,
    /// Actuator decision: `true` energizes the device.
    pub on: bool,
}

/// Stateful feedback controller driving one relay.
///
/// # Example
///
/// ```
/// use ec_controls::FeedbackController;
/// use ec_core::ControlParameters;
///
/// let params = ControlParameters::new(0.3, 0.2, 0.5).unwrap();
/// let mut heater = FeedbackController::new(params);
///
/// // 2 °C below target: p = 0.6, d = 0.4, output 1.0 > 0.5
/// assert!(heater.evaluate(18.0, 20.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackController {
    params: ControlParameters,
    mode: ControlMode,
    integral: f64,
    previous_error: f64,
}

impl FeedbackController {
    /// Create a controller in [`ControlMode::Feedback`] with zeroed state.
    pub fn new(params: ControlParameters) -> Self {
        Self {
            params,
            mode: ControlMode::Feedback,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    /// Select the control mode.
    pub fn with_mode(mut self, mode: ControlMode) -> Self {
        self.mode = mode;
        self
    }

    /// Install new gains and reset the accumulated state.
    ///
    /// The integral term and previous error are discarded: history gathered
    /// under the old gains is stale under the new ones.
    pub fn configure(&mut self, params: ControlParameters) {
        self.params = params;
        self.integral = 0.0;
        self.previous_error = 0.0;
    }

    /// Evaluate one (actual, target) pair and return the on/off decision.
    pub fn evaluate(&mut self, actual: f64, target: f64) -> bool {
        self.step(actual, target).on
    }

    /// Evaluate one (actual, target) pair, returning every term.
    ///
    /// Non-finite inputs yield a non-finite output; callers reject such
    /// readings before they get here.
    pub fn step(&mut self, actual: f64, target: f64) -> ControlOutput {
        let error = target - actual;

        if self.mode == ControlMode::OnOff {
            return ControlOutput {
                error,
                p: 0.0,
                i: 0.0,
                d: 0.0,
                output: 0.0,
                on: actual <= target,
            };
        }

        if self.params.ki() != 0.0 {
            self.integral += error;
        }

        let p = self.params.kp() * error;
        let d = self.params.kd() * (error - self.previous_error);
        let i = self.params.ki() * self.integral;
        let output = p + d + i;

        self.previous_error = error;

        ControlOutput {
            error,
            p,
            i,
            d,
            output,
            on: output > self.params.threshold(),
        }
    }

    pub fn params(&self) -> &ControlParameters {
        &self.params
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn previous_error(&self) -> f64 {
        self.previous_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec_core::{Tolerances, nearly_equal};

    fn pd(kp: f64, kd: f64, threshold: f64) -> FeedbackController {
        FeedbackController::new(ControlParameters::new(kp, kd, threshold).unwrap())
    }

    #[test]
    fn heater_turns_on_when_below_target() {
        let mut heater = pd(0.3, 0.2, 0.5);
        let out = heater.step(18.0, 20.0);

        let tol = Tolerances::default();
        assert!(nearly_equal(out.error, 2.0, tol));
        assert!(nearly_equal(out.p, 0.6, tol));
        assert!(nearly_equal(out.d, 0.4, tol));
        assert!(nearly_equal(out.output, 1.0, tol));
        assert!(out.on);
    }

    #[test]
    fn heater_stays_off_when_above_target() {
        let mut heater = pd(0.3, 0.2, 0.5);
        let out = heater.step(25.0, 20.0);

        let tol = Tolerances::default();
        assert!(nearly_equal(out.p, -1.5, tol));
        assert!(nearly_equal(out.d, -1.0, tol));
        assert!(nearly_equal(out.output, -2.5, tol));
        assert!(!out.on);
    }

    #[test]
    fn equal_values_give_zero_output() {
        let mut ctrl = pd(0.3, 0.2, 0.0);
        let out = ctrl.step(20.0, 20.0);
        assert_eq!(out.output, 0.0);
        // 0 > 0 is false
        assert!(!out.on);

        let mut negative_threshold = pd(0.3, 0.2, -0.1);
        assert!(negative_threshold.evaluate(20.0, 20.0));
    }

    #[test]
    fn previous_error_is_retained() {
        let mut ctrl = pd(0.3, 0.2, 0.5);
        ctrl.evaluate(18.0, 20.0);
        assert_eq!(ctrl.previous_error(), 2.0);

        // Error shrinks from 2 to 1: derivative is negative.
        let out = ctrl.step(19.0, 20.0);
        assert!(nearly_equal(out.d, -0.2, Tolerances::default()));
    }

    #[test]
    fn integral_only_accumulates_when_enabled() {
        let mut pd_only = pd(0.3, 0.2, 0.5);
        pd_only.evaluate(18.0, 20.0);
        pd_only.evaluate(18.0, 20.0);
        assert_eq!(pd_only.integral(), 0.0);

        let params = ControlParameters::new(0.3, 0.2, 0.5)
            .unwrap()
            .with_integral(0.1)
            .unwrap();
        let mut pid = FeedbackController::new(params);
        pid.evaluate(18.0, 20.0);
        let out = pid.step(18.0, 20.0);
        assert_eq!(pid.integral(), 4.0);
        assert!(nearly_equal(out.i, 0.4, Tolerances::default()));
    }

    #[test]
    fn configure_resets_state() {
        let params = ControlParameters::new(0.3, 0.2, 0.5)
            .unwrap()
            .with_integral(0.1)
            .unwrap();
        let mut ctrl = FeedbackController::new(params);
        for _ in 0..5 {
            ctrl.evaluate(15.0, 20.0);
        }
        assert!(ctrl.integral() > 0.0);

        ctrl.configure(params);
        assert_eq!(ctrl.integral(), 0.0);
        assert_eq!(ctrl.previous_error(), 0.0);

        let mut fresh = FeedbackController::new(params);
        assert_eq!(ctrl.step(17.0, 20.0), fresh.step(17.0, 20.0));
    }

    #[test]
    fn on_off_mode_bypasses_feedback() {
        // Gains that would never switch on in feedback mode.
        let mut ctrl = pd(0.0, 0.0, 100.0).with_mode(ControlMode::OnOff);
        assert!(ctrl.evaluate(18.0, 20.0));
        assert!(ctrl.evaluate(20.0, 20.0));
        assert!(!ctrl.evaluate(20.5, 20.0));
        assert_eq!(ctrl.previous_error(), 0.0);
    }

    #[test]
    fn mode_survives_configure() {
        let mut ctrl = pd(0.3, 0.2, 0.5).with_mode(ControlMode::OnOff);
        ctrl.configure(ControlParameters::new(1.0, 1.0, 1.0).unwrap());
        assert_eq!(ctrl.mode(), ControlMode::OnOff);
    }

    #[test]
    fn heater_releases_as_gap_closes() {
        let mut heater = pd(0.3, 0.2, 0.5);
        assert!(heater.evaluate(18.0, 20.0));

        // One heating step later: p = 0.4542, d = -0.0972, output 0.357.
        let out = heater.step(18.486, 20.0);
        assert!(nearly_equal(out.output, 0.357, Tolerances { abs: 1e-9, rel: 1e-9 }));
        assert!(!out.on);
    }
}
