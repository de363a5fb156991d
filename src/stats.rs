//! Fixed-window moving averages.

/// Integer division rounded to the nearest integer, ties away from zero.
pub fn div_round_nearest(dividend: i64, divisor: i64) -> i64 {
    if (dividend < 0) != (divisor < 0) {
        (dividend - divisor / 2) / divisor
    } else {
        (dividend + divisor / 2) / divisor
    }
}

/// Sample types the moving average can accumulate.
pub trait Sample: Copy + Default {
    /// Running-sum type, wide enough for `N` samples.
    type Sum: Copy;

    fn zero_sum() -> Self::Sum;
    fn add(sum: Self::Sum, sample: Self) -> Self::Sum;
    fn sub(sum: Self::Sum, sample: Self) -> Self::Sum;
    fn mean(sum: Self::Sum, count: usize) -> Self;
}

macro_rules! unsigned_sample {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            type Sum = u64;

            fn zero_sum() -> u64 {
                0
            }
            fn add(sum: u64, sample: Self) -> u64 {
                sum + u64::from(sample)
            }
            fn sub(sum: u64, sample: Self) -> u64 {
                sum - u64::from(sample)
            }
            fn mean(sum: u64, count: usize) -> Self {
                let count = count as u64;
                ((sum + count / 2) / count) as Self
            }
        }
    )*};
}

macro_rules! signed_sample {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            type Sum = i64;

            fn zero_sum() -> i64 {
                0
            }
            fn add(sum: i64, sample: Self) -> i64 {
                sum + i64::from(sample)
            }
            fn sub(sum: i64, sample: Self) -> i64 {
                sum - i64::from(sample)
            }
            fn mean(sum: i64, count: usize) -> Self {
                div_round_nearest(sum, count as i64) as Self
            }
        }
    )*};
}

unsigned_sample!(u8, u16, u32);
signed_sample!(i8, i16, i32);

impl Sample for f32 {
    type Sum = f32;

    fn zero_sum() -> f32 {
        0.0
    }
    fn add(sum: f32, sample: Self) -> f32 {
        sum + sample
    }
    fn sub(sum: f32, sample: Self) -> f32 {
        sum - sample
    }
    fn mean(sum: f32, count: usize) -> Self {
        sum / count as f32
    }
}

/// Mean of the last `N` samples.  The window starts filled with the
/// initial value, so the average is meaningful from the first update.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage<T: Sample, const N: usize> {
    window: [T; N],
    index: usize,
    sum: T::Sum,
}

impl<T: Sample, const N: usize> SimpleMovingAverage<T, N> {
    /// Panics if `N == 0`.
    pub fn new(initial: T) -> Self {
        assert!(N > 0, "moving average window must not be empty");
        let sum = (0..N).fold(T::zero_sum(), |sum, _| T::add(sum, initial));
        Self {
            window: [initial; N],
            index: 0,
            sum,
        }
    }

    /// Replace the oldest sample with `sample`.
    pub fn update(&mut self, sample: T) {
        self.index = (self.index + 1) % N;
        self.sum = T::sub(self.sum, self.window[self.index]);
        self.sum = T::add(self.sum, sample);
        self.window[self.index] = sample;
    }

    /// Current mean.  Integers round to nearest, ties away from zero.
    pub fn average(&self) -> T {
        T::mean(self.sum, N)
    }
}

impl<T: Sample, const N: usize> Default for SimpleMovingAverage<T, N> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_matches_float_division() {
        for dividend in -300i64..=300 {
            for divisor in -17i64..=17 {
                if divisor == 0 {
                    continue;
                }
                let expected = (dividend as f64 / divisor as f64).round() as i64;
                assert_eq!(div_round_nearest(dividend, divisor), expected, "{dividend}/{divisor}");
            }
        }
    }

    #[test]
    fn step_response() {
        let mut avg = SimpleMovingAverage::<i32, 5>::default();
        assert_eq!(avg.average(), 0);
        avg.update(0);
        assert_eq!(avg.average(), 0);
        for expected in [20, 40, 60, 80, 100] {
            avg.update(100);
            assert_eq!(avg.average(), expected);
        }
        avg.update(0);
        assert_eq!(avg.average(), 80);
        avg.update(200);
        assert_eq!(avg.average(), 100);
    }

    #[test]
    fn narrow_type_sum_does_not_overflow() {
        let mut avg = SimpleMovingAverage::<u8, 3>::default();
        avg.update(100);
        assert_eq!(avg.average(), 33);
        avg.update(100);
        assert_eq!(avg.average(), 67);
        avg.update(100);
        assert_eq!(avg.average(), 100);
        avg.update(100);
        assert_eq!(avg.average(), 100);
    }

    #[test]
    fn signed_rounds_away_from_zero() {
        let mut avg = SimpleMovingAverage::<i32, 4>::default();
        let steps = [(11, 3), (-100, -22), (-50, -35), (-76, -54), (40, -47), (-51, -34), (201, 29)];
        for (sample, expected) in steps {
            avg.update(sample);
            assert_eq!(avg.average(), expected, "after {sample}");
        }
    }

    #[test]
    fn initial_value_fills_window() {
        assert_eq!(SimpleMovingAverage::<i32, 5>::new(3).average(), 3);
        assert_eq!(SimpleMovingAverage::<u16, 8>::new(1000).average(), 1000);
    }

    #[test]
    fn float_average() {
        let mut avg = SimpleMovingAverage::<f32, 4>::new(100.0);
        avg.update(200.0);
        assert!((avg.average() - 125.0).abs() < 1e-4);
    }
}
