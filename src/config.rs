//! Caller-supplied knobs and the quantities every index scheme derives from them.

use crate::{Error, Result};

/// Configuration shared by every engine.
///
/// The engines assume valid ranges and never re-check them on the hot path; call
/// [`PprConfig::validate`] (or build through [`crate::Algorithm::build_checked`]) when the
/// values come from outside.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PprConfig {
    /// Restart probability, in `(0, 1)`.
    pub alpha: f64,
    /// Relative accuracy, in `(0, 1)`.
    pub eps: f64,
    /// Threshold scale: `det = det_fac * n^-det_exp`.
    pub det_fac: f64,
    pub det_exp: f64,
    /// Failure probability exponent: `pf = n^-pf_exp`.
    pub pf_exp: f64,
    /// Index size ratio; node `v` keeps `ceil(beta * (1 - alpha) * deg(v))` walks.
    pub beta: f64,
    /// Lazy scheme only: share of `eps` spent on propagation vs. stale walks.
    pub theta: f64,
    /// Exact propagation rounds.
    pub round: usize,
    /// Seed for the index schemes' RNG.
    pub seed: u64,
}

impl Default for PprConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            eps: 0.5,
            det_fac: 1.0,
            det_exp: 1.0,
            pf_exp: 1.0,
            beta: 1.0,
            theta: 0.5,
            round: 160,
            seed: 42,
        }
    }
}

impl PprConfig {
    pub fn validate(&self) -> Result<()> {
        fn open_unit(name: &str, x: f64) -> Result<()> {
            if x > 0.0 && x < 1.0 {
                Ok(())
            } else {
                Err(Error::InvalidParameter(format!("{name} must be in (0,1), got {x}")))
            }
        }
        open_unit("alpha", self.alpha)?;
        open_unit("eps", self.eps)?;
        open_unit("theta", self.theta)?;
        if !(self.det_fac >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "det_fac must be non-negative, got {}",
                self.det_fac
            )));
        }
        if !(self.det_exp >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "det_exp must be non-negative, got {}",
                self.det_exp
            )));
        }
        if !(self.pf_exp > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "pf_exp must be positive, got {}",
                self.pf_exp
            )));
        }
        if !(self.beta > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "beta must be positive, got {}",
                self.beta
            )));
        }
        Ok(())
    }
}

/// Per-instance constants of an index scheme, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexParams {
    pub alpha: f64,
    pub beta: f64,
    pub eps: f64,
    /// Base threshold `det_fac * n^-det_exp`.
    pub det: f64,
    /// Failure probability `n^-pf_exp`.
    pub pf: f64,
}

impl IndexParams {
    pub fn new(config: &PprConfig, node_count: usize) -> Self {
        let n = node_count as f64;
        Self {
            alpha: config.alpha,
            beta: config.beta,
            eps: config.eps,
            det: config.det_fac * n.powf(-config.det_exp),
            pf: n.powf(-config.pf_exp),
        }
    }

    /// Same parameters with a different accuracy.
    pub fn with_eps(self, eps: f64) -> Self {
        Self { eps, ..self }
    }

    /// Walks needed per unit residual at threshold `delta`.
    pub fn omega(&self, delta: f64) -> f64 {
        (2.0 + self.eps * 2.0 / 3.0) * (2.0 / self.pf).ln() / (self.eps * self.eps * delta)
    }

    /// Degree-normalized push threshold at `delta`.
    ///
    /// Never below the smallest normal `f64`: residual under it cannot shrink by pushing,
    /// because `(1 - alpha) * r` rounds back to `r`.
    pub fn rmax(&self, delta: f64) -> f64 {
        (self.beta / self.omega(delta).ceil()).max(f64::MIN_POSITIVE)
    }

    /// Walk samples drawn for a node holding `residual` at threshold `delta`.
    ///
    /// Zero at `delta == 0`: the push threshold is then zero too, and the caller settles
    /// residual directly instead of sampling.
    pub fn num_samples(&self, residual: f64, delta: f64) -> usize {
        let omega = self.omega(delta);
        if !omega.is_finite() {
            return 0;
        }
        ((1.0 - self.alpha) * residual * omega).ceil() as usize
    }

    /// Walks stored for a node of out-degree `degree`.
    pub fn index_size(&self, degree: usize) -> usize {
        (self.beta * (1.0 - self.alpha) * degree as f64).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PprConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let cfg = PprConfig { alpha: 1.0, ..PprConfig::default() };
        let msg = format!("{}", cfg.validate().unwrap_err());
        assert!(msg.contains("alpha"));

        let cfg = PprConfig { pf_exp: 0.0, ..PprConfig::default() };
        assert!(cfg.validate().is_err());

        let cfg = PprConfig { beta: f64::NAN, ..PprConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn derived_quantities() {
        let p = IndexParams::new(&PprConfig::default(), 100);
        assert!((p.det - 0.01).abs() < 1e-12);
        assert!((p.pf - 0.01).abs() < 1e-12);
        assert_eq!(p.index_size(0), 0);
        assert_eq!(p.index_size(1), 1);
        assert_eq!(p.index_size(5), 4);
        // Residual below rmax * deg never needs more samples than the node stores.
        let deg = 7;
        let r = p.rmax(p.det) * deg as f64 * 0.999;
        assert!(p.num_samples(r, p.det) <= p.index_size(deg));
    }

    #[test]
    fn zero_threshold_scale_disables_sampling() {
        let cfg = PprConfig { det_fac: 0.0, ..PprConfig::default() };
        cfg.validate().unwrap();
        let p = IndexParams::new(&cfg, 100);
        assert_eq!(p.det, 0.0);
        assert_eq!(p.rmax(p.det), f64::MIN_POSITIVE);
        assert_eq!(p.num_samples(0.3, p.det), 0);
    }
}
