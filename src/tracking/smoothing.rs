use std::collections::VecDeque;

use super::types::GazeSample;

/// `out = alpha * prev + (1 - alpha) * input`. The first input passes through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: None,
        }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        let out = match self.value {
            Some(prev) => self.alpha * prev + (1.0 - self.alpha) * input,
            None => input,
        };
        self.value = Some(out);
        out
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Two-stage gaze smoothing: a moving average over the last `capacity`
/// samples, then exponential blending with the previous output.
#[derive(Debug, Clone)]
pub struct GazeSmoother {
    history: VecDeque<GazeSample>,
    capacity: usize,
    x: Ema,
    y: Ema,
}

impl GazeSmoother {
    pub fn new(capacity: usize, alpha: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            x: Ema::new(alpha),
            y: Ema::new(alpha),
        }
    }

    pub fn update(&mut self, sample: GazeSample) -> GazeSample {
        self.history.push_back(sample);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let mean = self.window_mean();
        GazeSample::new(self.x.update(mean.x), self.y.update(mean.y))
    }

    pub fn window_mean(&self) -> GazeSample {
        if self.history.is_empty() {
            return GazeSample::CENTER;
        }
        let n = self.history.len() as f64;
        let (sx, sy) = self
            .history
            .iter()
            .fold((0.0, 0.0), |(ax, ay), s| (ax + s.x, ay + s.y));
        GazeSample::new(sx / n, sy / n)
    }

    pub fn current(&self) -> Option<GazeSample> {
        Some(GazeSample::new(self.x.value()?, self.y.value()?))
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Applies new parameters, dropping the oldest samples if the window shrinks.
    pub fn reconfigure(&mut self, capacity: usize, alpha: f64) {
        self.capacity = capacity.max(1);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        self.x.set_alpha(alpha);
        self.y.set_alpha(alpha);
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.x.reset();
        self.y.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_passes_through() {
        let mut s = GazeSmoother::new(5, 0.3);
        assert_eq!(s.update(GazeSample::new(0.2, 0.8)), GazeSample::new(0.2, 0.8));
    }

    #[test]
    fn history_is_bounded() {
        let mut s = GazeSmoother::new(3, 0.0);
        for i in 0..10 {
            s.update(GazeSample::new(i as f64 / 10.0, 0.5));
        }
        assert_eq!(s.len(), 3);
        let mean = s.window_mean();
        assert!((mean.x - 0.8).abs() < 1e-12);
    }

    #[test]
    fn constant_input_converges_monotonically() {
        let mut s = GazeSmoother::new(5, 0.3);
        s.update(GazeSample::new(0.0, 0.0));
        let target = GazeSample::new(1.0, 0.6);
        let mut prev_err = f64::INFINITY;
        for _ in 0..60 {
            let out = s.update(target);
            let err = (out.x - target.x).abs();
            assert!(err <= prev_err + 1e-12);
            prev_err = err;
        }
        assert!(prev_err < 1e-6);
        let mean = s.window_mean();
        assert!((mean.x - target.x).abs() < 1e-12);
        assert!((mean.y - target.y).abs() < 1e-12);
    }

    #[test]
    fn ema_blends_with_previous_output() {
        let mut ema = Ema::new(0.5);
        assert_eq!(ema.update(10.0), 10.0);
        assert_eq!(ema.update(0.0), 5.0);
        assert_eq!(ema.update(0.0), 2.5);
    }

    #[test]
    fn shrinking_window_drops_oldest() {
        let mut s = GazeSmoother::new(5, 0.3);
        for i in 0..5 {
            s.update(GazeSample::new(i as f64, 0.0));
        }
        s.reconfigure(2, 0.3);
        assert_eq!(s.len(), 2);
        assert_eq!(s.window_mean().x, 3.5);
    }
}
