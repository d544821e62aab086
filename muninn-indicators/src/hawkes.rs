//! Hawkes intensity with an exponential kernel.
//!
//! Between events the intensity decays toward the baseline; each event adds
//! a jump. For an event at time `t` after state `(λ_prev, t_prev)`:
//!
//! ```text
//! λ_t = μ + (λ_prev − μ) · exp(−β · (t − t_prev)) + α
//! ```
//!
//! The multivariate form keeps one intensity per event type and a flat
//! excitation matrix `α[src, dst]` indexed by type ordinals.

use crate::error::IndicatorError;

/// Timestamps this close together are treated as simultaneous.
const TIME_EPS: f64 = 1e-12;

/// Self-exciting intensity for a single event type.
pub struct HawkesIntensity {
    baseline: f64,
    alpha: f64,
    beta: f64,
    last_intensity: f64,
    last_timestamp: Option<f64>,
}

impl HawkesIntensity {
    pub fn new(baseline: f64, alpha: f64, beta: f64) -> Result<Self, IndicatorError> {
        validate_params(baseline, alpha, beta)?;
        Ok(Self {
            baseline,
            alpha,
            beta,
            last_intensity: baseline,
            last_timestamp: None,
        })
    }

    /// Back to the baseline with no event history.
    pub fn reset(&mut self) {
        self.last_intensity = self.baseline;
        self.last_timestamp = None;
    }

    /// Record an event at `timestamp` (seconds) and return the intensity
    /// immediately after it.
    pub fn update(&mut self, timestamp: f64) -> Result<f64, IndicatorError> {
        if !timestamp.is_finite() {
            return Err(IndicatorError::NonFiniteInput { name: "timestamp" });
        }
        if let Some(last) = self.last_timestamp {
            if timestamp + TIME_EPS < last {
                return Err(IndicatorError::NonMonotonicTime { last, got: timestamp });
            }
            let dt = (timestamp - last).max(0.0);
            self.last_intensity = self.decayed(dt) + self.alpha;
        } else {
            self.last_intensity = self.baseline + self.alpha;
        }
        self.last_timestamp = Some(timestamp);
        Ok(self.last_intensity)
    }

    /// Intensity immediately after the last event.
    pub fn current_intensity(&self) -> f64 {
        self.last_intensity
    }

    /// Query the decayed intensity at a future time without recording an
    /// event.
    pub fn intensity_at(&self, timestamp: f64) -> Result<f64, IndicatorError> {
        if !timestamp.is_finite() {
            return Err(IndicatorError::NonFiniteInput { name: "timestamp" });
        }
        match self.last_timestamp {
            Some(last) => {
                if timestamp + TIME_EPS < last {
                    return Err(IndicatorError::NonMonotonicTime { last, got: timestamp });
                }
                Ok(self.decayed((timestamp - last).max(0.0)))
            }
            None => Ok(self.baseline),
        }
    }

    fn decayed(&self, dt: f64) -> f64 {
        if dt <= 0.0 {
            return self.last_intensity;
        }
        self.baseline + (self.last_intensity - self.baseline) * (-self.beta * dt).exp()
    }
}

/// Mutually exciting intensities over `n` event types.
///
/// `alpha` is row-major: `alpha[src * n + dst]` is the jump an event of type
/// `src` adds to type `dst`'s intensity.
pub struct MultivariateHawkes {
    n: usize,
    baseline: Vec<f64>,
    alpha: Vec<f64>,
    beta: Vec<f64>,
    intensities: Vec<f64>,
    last_timestamp: Option<f64>,
}

impl MultivariateHawkes {
    pub fn new(baseline: Vec<f64>, alpha: Vec<f64>, beta: Vec<f64>) -> Result<Self, IndicatorError> {
        let n = baseline.len();
        if n == 0 {
            return Err(IndicatorError::InvalidParameter {
                name: "baseline",
                reason: "at least one event type is required".to_string(),
            });
        }
        if alpha.len() != n * n {
            return Err(IndicatorError::InvalidParameter {
                name: "alpha",
                reason: format!("expected {}x{} entries, got {}", n, n, alpha.len()),
            });
        }
        if beta.len() != n {
            return Err(IndicatorError::InvalidParameter {
                name: "beta",
                reason: format!("expected {} entries, got {}", n, beta.len()),
            });
        }
        for (i, &mu) in baseline.iter().enumerate() {
            for &a in &alpha[i * n..(i + 1) * n] {
                validate_params(mu, a, beta[i])?;
            }
        }
        let intensities = baseline.clone();
        Ok(Self {
            n,
            baseline,
            alpha,
            beta,
            intensities,
            last_timestamp: None,
        })
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn reset(&mut self) {
        self.intensities.copy_from_slice(&self.baseline);
        self.last_timestamp = None;
    }

    /// Record an event of type `src` at `timestamp`; every type's intensity
    /// decays over the gap, then receives its `alpha[src, dst]` jump.
    pub fn update(&mut self, src: usize, timestamp: f64) -> Result<&[f64], IndicatorError> {
        if src >= self.n {
            return Err(IndicatorError::EventTypeOutOfRange { got: src, dimension: self.n });
        }
        if !timestamp.is_finite() {
            return Err(IndicatorError::NonFiniteInput { name: "timestamp" });
        }
        if let Some(last) = self.last_timestamp {
            if timestamp + TIME_EPS < last {
                return Err(IndicatorError::NonMonotonicTime { last, got: timestamp });
            }
            let dt = (timestamp - last).max(0.0);
            if dt > 0.0 {
                for d in 0..self.n {
                    let decay = (-self.beta[d] * dt).exp();
                    self.intensities[d] =
                        self.baseline[d] + (self.intensities[d] - self.baseline[d]) * decay;
                }
            }
        }
        for d in 0..self.n {
            self.intensities[d] += self.alpha[src * self.n + d];
        }
        self.last_timestamp = Some(timestamp);
        Ok(&self.intensities)
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }
}

fn validate_params(baseline: f64, alpha: f64, beta: f64) -> Result<(), IndicatorError> {
    if !baseline.is_finite() || baseline < 0.0 {
        return Err(IndicatorError::InvalidParameter {
            name: "baseline",
            reason: format!("{} must be finite and >= 0", baseline),
        });
    }
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(IndicatorError::InvalidParameter {
            name: "alpha",
            reason: format!("{} must be finite and >= 0", alpha),
        });
    }
    if !beta.is_finite() || beta <= 0.0 {
        return Err(IndicatorError::InvalidParameter {
            name: "beta",
            reason: format!("{} must be finite and > 0", beta),
        });
    }
    Ok(())
}
