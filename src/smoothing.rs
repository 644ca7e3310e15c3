// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// A moving average over the last N samples.
pub struct MovingAverage {
    /// The last N samples, oldest overwritten first.
    window: Vec<f32>,
    /// Where the next sample goes.
    position: usize,
    /// Running sum of the window.
    sum: f64,
}

impl MovingAverage {
    /// Creates a moving average over the given number of samples. Returns None for
    /// windows that wouldn't smooth anything.
    pub fn new(size: usize) -> Option<MovingAverage> {
        if size < 2 {
            return None;
        }

        Some(MovingAverage {
            window: vec![0.0; size],
            position: 0,
            sum: 0.0,
        })
    }

    /// Adds a sample and returns the average of the window.
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        self.sum += f64::from(sample) - f64::from(self.window[self.position]);
        self.window[self.position] = sample;
        self.position = (self.position + 1) % self.window.len();
        (self.sum / self.window.len() as f64) as f32
    }

    /// The number of samples averaged.
    pub fn len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod test {
    use super::MovingAverage;

    #[test]
    fn test_small_windows_disabled() {
        assert!(MovingAverage::new(0).is_none());
        assert!(MovingAverage::new(1).is_none());
        assert_eq!(2, MovingAverage::new(2).unwrap().len());
    }

    #[test]
    fn test_slides() {
        let mut average = MovingAverage::new(3).unwrap();
        let output: Vec<f32> = [3.0, 3.0, 3.0, 6.0, 9.0, 0.0, 0.0, 0.0]
            .into_iter()
            .map(|sample| average.process(sample))
            .collect();
        assert_eq!(vec![1.0, 2.0, 3.0, 4.0, 6.0, 5.0, 3.0, 0.0], output);
    }

    #[test]
    fn test_constant_input() {
        let mut average = MovingAverage::new(8).unwrap();
        let mut last = 0.0;
        for _ in 0..1000 {
            last = average.process(0.5);
        }
        assert!((last - 0.5).abs() < 1e-6);
    }
}
