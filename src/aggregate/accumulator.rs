/// Running sum over the non-null values of one column, with SQL `SUM`/`AVG`
/// null semantics: both are `None` when no value was present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator {
    sum: f64,
    present: u64,
}

impl Accumulator {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.present += 1;
        }
    }

    pub fn total(&self) -> Option<f64> {
        (self.present > 0).then_some(self.sum)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.present > 0).then(|| self.sum / self.present as f64)
    }
}

/// Integer flavour of [`Accumulator`]; the mean is taken in floating point so
/// that averaging passenger counts does not truncate. The sum saturates at the
/// `i64` bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntAccumulator {
    sum: i64,
    present: u64,
}

impl IntAccumulator {
    pub fn push(&mut self, value: Option<i64>) {
        if let Some(v) = value {
            self.sum = self.sum.saturating_add(v);
            self.present += 1;
        }
    }

    pub fn total(&self) -> Option<i64> {
        (self.present > 0).then_some(self.sum)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.present > 0).then(|| self.sum as f64 / self.present as f64)
    }
}
