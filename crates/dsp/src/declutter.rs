use num_complex::Complex32;

/// Smoothing factor of the background tracker.
pub const DEFAULT_ALPHA: f32 = 0.9;

/// Which subtraction the filter applies once a channel is primed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclutterVariant {
    /// Background updated first; output is the input minus the *updated*
    /// background.
    Subtract,
    /// Output is the input minus the *previous* background, scaled by
    /// (1 + alpha) / 2; the background is updated afterwards.
    Normalized,
}

/// Per-channel static-reflection remover.
///
/// Each channel owns a running complex background estimate updated by
/// exponential smoothing. The first sample on a channel establishes the
/// baseline and yields an all-zero output. The two variants are not
/// interchangeable; a consuming view must stick to one.
///
/// Not thread-safe: exactly one producer per channel. State lives for one
/// visualization session and is discarded with the filter.
pub struct Declutter {
    alpha: f32,
    normalization: f32,
    variant: DeclutterVariant,
    background: Vec<Vec<Complex32>>,
    primed: Vec<bool>,
}

impl Declutter {
    pub fn new(num_channels: usize, variant: DeclutterVariant) -> Self {
        Self::with_alpha(num_channels, variant, DEFAULT_ALPHA)
    }

    pub fn with_alpha(num_channels: usize, variant: DeclutterVariant, alpha: f32) -> Self {
        Self {
            alpha,
            normalization: (1.0 + alpha) / 2.0,
            variant,
            background: vec![Vec::new(); num_channels],
            primed: vec![false; num_channels],
        }
    }

    /// Process one CIR vector for `channel`, returning the background-
    /// subtracted signal. Panics if `channel` is out of range.
    pub fn execute(&mut self, channel: usize, cir: &[Complex32]) -> Vec<Complex32> {
        if !self.primed[channel] {
            self.background[channel] = cir.to_vec();
            self.primed[channel] = true;
            return vec![Complex32::new(0.0, 0.0); cir.len()];
        }

        let alpha = self.alpha;
        let bg = &mut self.background[channel];
        match self.variant {
            DeclutterVariant::Subtract => {
                for (b, &x) in bg.iter_mut().zip(cir) {
                    *b = *b * alpha + x * (1.0 - alpha);
                }
                bg.iter().zip(cir).map(|(b, &x)| x - b).collect()
            }
            DeclutterVariant::Normalized => {
                let out: Vec<Complex32> = bg
                    .iter()
                    .zip(cir)
                    .map(|(b, &x)| (x - b) * self.normalization)
                    .collect();
                for (b, &x) in bg.iter_mut().zip(cir) {
                    *b = *b * alpha + x * (1.0 - alpha);
                }
                out
            }
        }
    }
}
