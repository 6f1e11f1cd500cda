use crate::data::model::WavelengthGrid;
use crate::error::{HyperspecError, Result};

/// How one target wavelength is read from a source spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Sample {
    /// Copy a source value: exact grid hit, or clamped outside the range.
    At(usize),
    /// `spectrum[lo] + weight * (spectrum[hi] - spectrum[lo])`.
    Between { lo: usize, hi: usize, weight: f64 },
}

/// Precomputed linear interpolation from one wavelength grid onto another.
///
/// Building the plan does the bracket search once; [`ResamplePlan::apply`]
/// is then O(target length) per spectrum. Targets outside the source range
/// are clamped to the value at the nearest source end.
#[derive(Debug, Clone, PartialEq)]
pub struct ResamplePlan {
    source_len: usize,
    samples: Vec<Sample>,
}

impl ResamplePlan {
    pub fn new(source: &WavelengthGrid, target: &WavelengthGrid) -> Result<Self> {
        let n = source.len();
        if n == 0 {
            return Err(HyperspecError::DegenerateSpectrum);
        }
        let ascending = source.is_ascending();
        // Work on the increasing orientation; map positions back for
        // decreasing grids.
        let xs: Vec<f64> = if ascending {
            source.as_slice().to_vec()
        } else {
            source.as_slice().iter().rev().copied().collect()
        };
        let original = |i: usize| if ascending { i } else { n - 1 - i };

        let samples = target
            .as_slice()
            .iter()
            .map(|&t| {
                if t <= xs[0] {
                    return Sample::At(original(0));
                }
                if t >= xs[n - 1] {
                    return Sample::At(original(n - 1));
                }
                // xs[j] <= t < xs[j + 1]
                let j = xs.partition_point(|&x| x <= t) - 1;
                if xs[j] == t {
                    return Sample::At(original(j));
                }
                Sample::Between {
                    lo: original(j),
                    hi: original(j + 1),
                    weight: (t - xs[j]) / (xs[j + 1] - xs[j]),
                }
            })
            .collect();

        Ok(ResamplePlan {
            source_len: n,
            samples,
        })
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn target_len(&self) -> usize {
        self.samples.len()
    }

    /// Resample one spectrum aligned to the source grid.
    pub fn apply(&self, spectrum: &[f64]) -> Result<Vec<f64>> {
        if spectrum.len() != self.source_len {
            return Err(HyperspecError::shape(
                format!("spectrum of {} values (source grid length)", self.source_len),
                format!("{} values", spectrum.len()),
            ));
        }
        Ok(self
            .samples
            .iter()
            .map(|s| match *s {
                Sample::At(i) => spectrum[i],
                Sample::Between { lo, hi, weight } => {
                    spectrum[lo] + weight * (spectrum[hi] - spectrum[lo])
                }
            })
            .collect())
    }
}

/// Linearly interpolate `spectrum` (aligned to `source`) at every wavelength
/// of `target`, clamping outside the source range.
pub fn interpolate_spectrum(
    source: &WavelengthGrid,
    target: &WavelengthGrid,
    spectrum: &[f64],
) -> Result<Vec<f64>> {
    ResamplePlan::new(source, target)?.apply(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(values: &[f64]) -> WavelengthGrid {
        WavelengthGrid::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_identity_on_source_grid() {
        let source = grid(&[900.0, 910.5, 925.0, 1000.0, 1700.25]);
        let spectrum = [0.12, -0.5, 3.25, 1e-9, 42.0];
        let out = interpolate_spectrum(&source, &source, &spectrum).unwrap();
        assert_eq!(out, spectrum.to_vec());
    }

    #[test]
    fn test_clamping_outside_range() {
        let source = grid(&[1.0, 2.0, 3.0]);
        let target = grid(&[-10.0, 0.999, 3.001, 50.0]);
        let out = interpolate_spectrum(&source, &target, &[5.0, 6.0, 9.0]).unwrap();
        assert_eq!(out, vec![5.0, 5.0, 9.0, 9.0]);
    }

    #[test]
    fn test_linear_between_samples() {
        let source = grid(&[0.0, 10.0, 20.0]);
        let target = grid(&[2.5, 10.0, 15.0]);
        let out = interpolate_spectrum(&source, &target, &[0.0, 1.0, -1.0]).unwrap();
        assert!((out[0] - 0.25).abs() < 1e-12);
        assert_eq!(out[1], 1.0);
        assert!((out[2] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_decreasing_source_grid() {
        // wavenumbers usually run high -> low
        let source = grid(&[4000.0, 3000.0, 2000.0]);
        let spectrum = [0.4, 0.3, 0.2];
        let target = grid(&[1500.0, 2500.0, 3000.0, 4500.0]);
        let out = interpolate_spectrum(&source, &target, &spectrum).unwrap();
        // below the smallest wavenumber -> value at 2000; above largest -> value at 4000
        assert_eq!(out[0], 0.2);
        assert!((out[1] - 0.25).abs() < 1e-12);
        assert_eq!(out[2], 0.3);
        assert_eq!(out[3], 0.4);

        let same = interpolate_spectrum(&source, &source, &spectrum).unwrap();
        assert_eq!(same, spectrum.to_vec());
    }

    #[test]
    fn test_target_length_differs_from_source() {
        let source = grid(&[1.0, 2.0, 3.0, 4.0]);
        let target = grid(&[1.5, 3.5]);
        let plan = ResamplePlan::new(&source, &target).unwrap();
        assert_eq!(plan.source_len(), 4);
        assert_eq!(plan.target_len(), 2);
        let out = plan.apply(&[10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(out, vec![15.0, 35.0]);
    }

    #[test]
    fn test_single_point_source() {
        let source = grid(&[5.0]);
        let target = grid(&[1.0, 5.0, 9.0]);
        let out = interpolate_spectrum(&source, &target, &[0.7]).unwrap();
        assert_eq!(out, vec![0.7, 0.7, 0.7]);
    }

    #[test]
    fn test_errors() {
        let source = grid(&[1.0, 2.0, 3.0]);
        let err = interpolate_spectrum(&source, &source, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, HyperspecError::ShapeMismatch { .. }));

        let empty = grid(&[]);
        assert_eq!(
            interpolate_spectrum(&empty, &source, &[]),
            Err(HyperspecError::DegenerateSpectrum)
        );
    }

    #[test]
    fn test_repeatable() {
        let source = grid(&[1.0, 1.3, 2.9, 4.4]);
        let target = grid(&[0.5, 1.1, 2.0, 3.3, 4.0, 5.0]);
        let spectrum = [0.1, 0.9, 0.4, 0.8];
        let a = interpolate_spectrum(&source, &target, &spectrum).unwrap();
        let b = interpolate_spectrum(&source, &target, &spectrum).unwrap();
        assert_eq!(a, b);
    }
}
