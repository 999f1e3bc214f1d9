//! Generalized Extreme Value fitting
//!
//! Shape follows the hydrological convention: `ξ > 0` gives a heavy (Fréchet-type)
//! upper tail, `ξ < 0` a bounded (Weibull-type) one and `ξ → 0` the Gumbel limit.
//! Parameters are estimated by maximum likelihood using a Nelder-Mead simplex over
//! `(μ, ln σ, ξ)`, so scale stays positive throughout the search. The search runs on
//! standardised samples, which keeps its stopping rule independent of data magnitude.

use crate::config::FittingConfig;
use crate::core_types::TimeSeries;
use crate::error::{FloodRiskError, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

/// Below this |ξ| the Gumbel closed forms are used.
const GUMBEL_EPSILON: f64 = 1e-9;

/// Shape values outside ±1 make the likelihood unbounded near the support edge.
const SHAPE_BOUND: f64 = 1.0;

const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// A GEV distribution with validated parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GevDistribution {
    shape: f64,
    location: f64,
    scale: f64,
}

impl GevDistribution {
    /// Create a distribution.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::FitConvergence`] when `scale` is not a positive finite
    /// number or any parameter is non-finite.
    pub fn new(shape: f64, location: f64, scale: f64) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(FloodRiskError::FitConvergence {
                reason: format!("scale must be positive and finite, got {scale}"),
            });
        }
        if !shape.is_finite() || !location.is_finite() {
            return Err(FloodRiskError::FitConvergence {
                reason: format!("non-finite parameters (shape {shape}, location {location})"),
            });
        }
        Ok(Self {
            shape,
            location,
            scale,
        })
    }

    #[inline]
    pub fn shape(&self) -> f64 {
        self.shape
    }

    #[inline]
    pub fn location(&self) -> f64 {
        self.location
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Cumulative distribution function, `P(X ≤ x)`.
    pub fn cdf(&self, x: f64) -> f64 {
        let z = (x - self.location) / self.scale;
        if self.shape.abs() < GUMBEL_EPSILON {
            return (-(-z).exp()).exp();
        }
        let t = 1.0 + self.shape * z;
        if t <= 0.0 {
            // Outside the support: below the lower bound (ξ > 0) or above the upper bound (ξ < 0)
            return if self.shape > 0.0 { 0.0 } else { 1.0 };
        }
        (-t.powf(-1.0 / self.shape)).exp()
    }

    /// Quantile function, the magnitude with non-exceedance probability `p`.
    ///
    /// `p` must lie strictly inside (0, 1); the endpoints map to the support bounds.
    pub fn quantile(&self, p: f64) -> f64 {
        let y = -p.ln();
        if self.shape.abs() < GUMBEL_EPSILON {
            self.location - self.scale * y.ln()
        } else {
            self.location + self.scale / self.shape * (y.powf(-self.shape) - 1.0)
        }
    }

    /// Log-likelihood of `data`; `-inf` when any sample lies outside the support.
    pub fn log_likelihood(&self, data: &[f64]) -> f64 {
        -negative_log_likelihood(self.location, self.scale, self.shape, data)
    }
}

fn negative_log_likelihood(location: f64, scale: f64, shape: f64, data: &[f64]) -> f64 {
    if !(scale.is_finite() && scale > 0.0) {
        return f64::INFINITY;
    }
    let ln_scale = scale.ln();
    let mut total = 0.0;
    if shape.abs() < GUMBEL_EPSILON {
        for &x in data {
            let z = (x - location) / scale;
            total += ln_scale + z + (-z).exp();
        }
    } else {
        let inv = 1.0 / shape;
        for &x in data {
            let t = 1.0 + shape * (x - location) / scale;
            if t <= 0.0 {
                return f64::INFINITY;
            }
            total += ln_scale + (1.0 + inv) * t.ln() + t.powf(-inv);
        }
    }
    if total.is_nan() {
        f64::INFINITY
    } else {
        total
    }
}

/// Goodness-of-fit classification.
///
/// Poor fits are never reported: a fit either converges (and is `Good` or `Moderate`)
/// or fails with [`FloodRiskError::FitConvergence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    Good,
    Moderate,
}

/// Result of a successful fit: the distribution plus its goodness of fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GevParameters {
    pub distribution: GevDistribution,
    /// Kolmogorov-Smirnov statistic against the fitted CDF
    pub ks_statistic: f64,
    pub p_value: f64,
    pub fit_quality: FitQuality,
    pub sample_count: usize,
    pub log_likelihood: f64,
    /// Simplex iterations used by the optimiser
    pub iterations: usize,
}

impl GevParameters {
    #[inline]
    pub fn shape(&self) -> f64 {
        self.distribution.shape
    }

    #[inline]
    pub fn location(&self) -> f64 {
        self.distribution.location
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.distribution.scale
    }
}

/// Maximum-likelihood GEV fitter.
#[derive(Debug, Clone, Default)]
pub struct GevFitter {
    config: FittingConfig,
}

impl GevFitter {
    pub fn new(config: FittingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FittingConfig {
        &self.config
    }

    /// Fit a GEV distribution to `samples` (annual maxima or raw magnitudes).
    ///
    /// # Errors
    ///
    /// - [`FloodRiskError::InsufficientData`] with fewer than `min_samples` values
    /// - [`FloodRiskError::Validation`] for a negative or non-finite sample
    /// - [`FloodRiskError::FitConvergence`] for a zero-variance sample, an optimiser that
    ///   fails to converge, or unusable parameters
    pub fn fit(&self, samples: &[f64]) -> Result<GevParameters> {
        if samples.len() < self.config.min_samples {
            return Err(FloodRiskError::InsufficientData {
                what: "GEV fit",
                required: self.config.min_samples,
                actual: samples.len(),
            });
        }
        if let Some(bad) = samples.iter().find(|x| !x.is_finite() || **x < 0.0) {
            return Err(FloodRiskError::validation(
                "samples",
                format!("GEV samples must be finite and non-negative, got {bad}"),
            ));
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();
        if std_dev <= f64::EPSILON * mean.abs() {
            return Err(FloodRiskError::FitConvergence {
                reason: "samples have zero variance".to_string(),
            });
        }

        // Optimised on standardised samples; location and scale are mapped back below
        let standardised: Vec<f64> = samples.iter().map(|x| (x - mean) / std_dev).collect();

        // Method-of-moments Gumbel estimate as the starting point
        let scale0 = 6.0_f64.sqrt() / PI;
        let location0 = -EULER_MASCHERONI * scale0;
        let start = Vector3::new(location0, scale0.ln(), 0.0);
        let steps = Vector3::new(0.1 * scale0, 0.1, 0.1);

        let objective = |v: &Vector3<f64>| {
            if v.z.abs() > SHAPE_BOUND {
                return f64::INFINITY;
            }
            negative_log_likelihood(v.x, v.y.exp(), v.z, &standardised)
        };

        let optimum = nelder_mead(
            objective,
            start,
            steps,
            self.config.max_iterations,
            self.config.tolerance,
        )?;
        if !optimum.value.is_finite() {
            return Err(FloodRiskError::FitConvergence {
                reason: "log-likelihood is not finite at the optimum".to_string(),
            });
        }

        let distribution = GevDistribution::new(
            optimum.point.z,
            mean + std_dev * optimum.point.x,
            std_dev * optimum.point.y.exp(),
        )?;
        let (ks_statistic, p_value) = ks_test(samples, &distribution);
        let fit_quality = if p_value > self.config.good_fit_p_value {
            FitQuality::Good
        } else {
            FitQuality::Moderate
        };

        info!(
            samples = samples.len(),
            shape = distribution.shape,
            location = distribution.location,
            scale = distribution.scale,
            ks_statistic,
            p_value,
            ?fit_quality,
            iterations = optimum.iterations,
            "GEV fit complete"
        );
        if fit_quality == FitQuality::Moderate {
            warn!(p_value, "GEV fit quality is moderate");
        }

        Ok(GevParameters {
            distribution,
            ks_statistic,
            p_value,
            fit_quality,
            sample_count: samples.len(),
            log_likelihood: distribution.log_likelihood(samples),
            iterations: optimum.iterations,
        })
    }

    /// Fit to the calendar-year maxima of a daily series.
    ///
    /// # Errors
    ///
    /// Same as [`GevFitter::fit`], counting years rather than days.
    pub fn fit_series(&self, series: &TimeSeries) -> Result<GevParameters> {
        let maxima = series.annual_maxima();
        debug!(
            days = series.len(),
            years = maxima.len(),
            "Extracted annual maxima"
        );
        self.fit(maxima.values())
    }
}

// ============================================================================
// GOODNESS OF FIT
// ============================================================================

/// One-sample Kolmogorov-Smirnov test of `samples` against `dist`.
///
/// Returns `(D, p)`. The p-value uses the asymptotic Kolmogorov distribution with
/// Stephens' small-sample correction `λ = (√n + 0.12 + 0.11/√n)·D`.
pub fn ks_test(samples: &[f64], dist: &GevDistribution) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 1.0);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let statistic = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let fitted = dist.cdf(x);
            let above = (i as f64 + 1.0) / n - fitted;
            let below = fitted - i as f64 / n;
            above.max(below)
        })
        .fold(0.0_f64, f64::max);
    let sqrt_n = n.sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * statistic;
    (statistic, kolmogorov_survival(lambda))
}

/// `Q(λ) = P(K > λ)` for the Kolmogorov distribution, clamped to [0, 1].
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let q = if lambda < 1.18 {
        // Jacobi-theta form converges quickly for small λ
        let y = (-PI * PI / (8.0 * lambda * lambda)).exp();
        let cdf = (2.0 * PI).sqrt() / lambda * (y + y.powi(9) + y.powi(25) + y.powi(49));
        1.0 - cdf
    } else {
        let x = (-2.0 * lambda * lambda).exp();
        2.0 * (x - x.powi(4) + x.powi(9) - x.powi(16))
    };
    q.clamp(0.0, 1.0)
}

// ============================================================================
// OPTIMISER
// ============================================================================

struct Optimum {
    point: Vector3<f64>,
    value: f64,
    iterations: usize,
}

/// Nelder-Mead minimisation in three dimensions.
///
/// Converges when the spread of objective values across the simplex falls below
/// `tolerance` (relative) and the simplex diameter below `√tolerance`.
fn nelder_mead<F>(
    objective: F,
    start: Vector3<f64>,
    steps: Vector3<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> Result<Optimum>
where
    F: Fn(&Vector3<f64>) -> f64,
{
    const REFLECT: f64 = 1.0;
    const EXPAND: f64 = 2.0;
    const CONTRACT: f64 = 0.5;
    const SHRINK: f64 = 0.5;

    let mut simplex: Vec<(Vector3<f64>, f64)> = Vec::with_capacity(4);
    simplex.push((start, objective(&start)));
    for axis in 0..3 {
        let mut vertex = start;
        vertex[axis] += steps[axis];
        simplex.push((vertex, objective(&vertex)));
    }

    let x_tolerance = tolerance.sqrt();
    for iteration in 0..max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (best_point, best) = simplex[0];
        let worst = simplex[3].1;

        let diameter = simplex[1..]
            .iter()
            .map(|(v, _)| (v - best_point).amax())
            .fold(0.0_f64, f64::max);
        if best.is_finite()
            && (worst - best).abs() <= tolerance * (1.0 + best.abs())
            && diameter <= x_tolerance
        {
            return Ok(Optimum {
                point: best_point,
                value: best,
                iterations: iteration,
            });
        }

        let centroid = (simplex[0].0 + simplex[1].0 + simplex[2].0) / 3.0;
        let worst_point = simplex[3].0;
        let reflected = centroid + (centroid - worst_point) * REFLECT;
        let f_reflected = objective(&reflected);

        if f_reflected < best {
            let expanded = centroid + (centroid - worst_point) * EXPAND;
            let f_expanded = objective(&expanded);
            simplex[3] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
        } else if f_reflected < simplex[2].1 {
            simplex[3] = (reflected, f_reflected);
        } else {
            let contracted = if f_reflected < worst {
                centroid + (reflected - centroid) * CONTRACT
            } else {
                centroid + (worst_point - centroid) * CONTRACT
            };
            let f_contracted = objective(&contracted);
            if f_contracted < f_reflected.min(worst) {
                simplex[3] = (contracted, f_contracted);
            } else {
                for vertex in &mut simplex[1..] {
                    vertex.0 = best_point + (vertex.0 - best_point) * SHRINK;
                    vertex.1 = objective(&vertex.0);
                }
            }
        }
    }

    Err(FloodRiskError::FitConvergence {
        reason: format!("optimiser did not converge within {max_iterations} iterations"),
    })
}
