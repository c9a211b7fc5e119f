//! Average True Range, incremental Wilder smoothing.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), or
//! high-low on the very first bar. The first `period` true ranges seed the
//! average with their simple mean; afterwards avg = (avg*(period-1) + tr) / period.

/// True range of one bar given the previous close, if any.
pub fn true_range(high: f64, low: f64, prev_close: Option<f64>) -> f64 {
    match prev_close {
        None => high - low,
        Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
    }
}

#[derive(Debug, Clone)]
pub struct WilderAtr {
    period: usize,
    warmup: Vec<f64>,
    value: Option<f64>,
}

impl WilderAtr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            warmup: Vec::with_capacity(period),
            value: None,
        }
    }

    /// Feed one true range. Returns the average once seeded.
    pub fn update(&mut self, tr: f64) -> Option<f64> {
        match self.value {
            None => {
                self.warmup.push(tr);
                if self.warmup.len() == self.period {
                    let seed = self.warmup.iter().sum::<f64>() / self.period as f64;
                    self.value = Some(seed);
                    self.warmup.clear();
                }
            }
            Some(prev) => {
                let n = self.period as f64;
                self.value = Some((prev * (n - 1.0) + tr) / n);
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn period(&self) -> usize {
        self.period
    }
}
