use crate::protocol::AlignedObservation;

/// Default minimum PAR change between consecutive observations
pub const DEFAULT_PAR_THRESHOLD: f64 = 1.0;

/// Default minimum photodiode change (mV) between consecutive observations
pub const DEFAULT_PHOTODIODE_THRESHOLD: f64 = 1.0;

/// Drops stale readings: observations that barely differ from the one
/// captured before them
#[derive(Debug, Clone, Copy)]
pub struct NoiseFilter {
    par_threshold: f64,
    photodiode_threshold: f64,
}

impl NoiseFilter {
    pub fn new(par_threshold: f64, photodiode_threshold: f64) -> Self {
        Self {
            par_threshold,
            photodiode_threshold,
        }
    }

    /// Keep observations whose reference and photodiode values both moved by
    /// more than their thresholds since the previous observation
    ///
    /// Input must be in capture order. The first observation has nothing to
    /// diff against and is always dropped.
    pub fn filter(&self, observations: &[AlignedObservation]) -> Vec<AlignedObservation> {
        let kept: Vec<AlignedObservation> = observations
            .windows(2)
            .filter(|pair| {
                let par_step = (pair[1].reference_value - pair[0].reference_value).abs();
                let mv_step = (pair[1].photodiode_value - pair[0].photodiode_value).abs();
                par_step > self.par_threshold && mv_step > self.photodiode_threshold
            })
            .map(|pair| pair[1])
            .collect();

        tracing::debug!(
            "Noise filter kept {} of {} observations",
            kept.len(),
            observations.len()
        );

        kept
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PAR_THRESHOLD, DEFAULT_PHOTODIODE_THRESHOLD)
    }
}
