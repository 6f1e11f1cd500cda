use super::quartile::{estimate_quartiles_with, QuartileMethod};
use crate::data::model::{PixelRecord, QuartileBounds};
use crate::error::{HyperspecError, Result};

/// IQR multiplier used when the caller does not pick one.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.0;

// ---------------------------------------------------------------------------
// FilterReport – what a Tukey pass did
// ---------------------------------------------------------------------------

/// Summary of one outlier-filter pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterReport {
    pub bounds: QuartileBounds,
    pub multiplier: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub original_len: usize,
    pub retained_len: usize,
}

impl FilterReport {
    pub fn removed_len(&self) -> usize {
        self.original_len - self.retained_len
    }

    /// Percent of the input removed by the filter (0 for an empty input).
    pub fn percent_removed(&self) -> f64 {
        percent_removed(self.original_len, self.retained_len)
    }
}

/// `(1 - retained / original) * 100`, or 0 when `original` is 0.
pub fn percent_removed(original: usize, retained: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - retained as f64 / original as f64) * 100.0
}

// ---------------------------------------------------------------------------
// Tukey filtering
// ---------------------------------------------------------------------------

/// Keep the records whose `value` lies within the Tukey fences
/// `[q1 - m*iqr, q3 + m*iqr]` (inclusive), in their original order.
///
/// * `multiplier = 1.0` keeps roughly the central 70–75 % of a normal population.
/// * `multiplier = 1.5` keeps roughly 95 %.
/// * `multiplier = 0.0` keeps exactly the `[q1, q3]` window.
///
/// NaN values never satisfy the fence comparison and are dropped.
pub fn filter_by_iqr(records: &[PixelRecord], multiplier: f64) -> Result<Vec<PixelRecord>> {
    filter_by_iqr_with_report(records, multiplier, QuartileMethod::SplitMedian)
        .map(|(kept, _)| kept)
}

/// [`filter_by_iqr`] with a selectable quartile method, also returning a
/// [`FilterReport`].
pub fn filter_by_iqr_with_report(
    records: &[PixelRecord],
    multiplier: f64,
    method: QuartileMethod,
) -> Result<(Vec<PixelRecord>, FilterReport)> {
    check_multiplier(multiplier)?;
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();
    let bounds = estimate_quartiles_with(&values, method)?;
    let (lower, upper) = bounds.fences(multiplier);

    let kept: Vec<PixelRecord> = retained_indices(&values, lower, upper)
        .into_iter()
        .map(|i| records[i])
        .collect();

    let report = FilterReport {
        bounds,
        multiplier,
        lower_fence: lower,
        upper_fence: upper,
        original_len: records.len(),
        retained_len: kept.len(),
    };
    log::debug!(
        "tukey filter m={multiplier}: fences [{lower}, {upper}], kept {}/{}",
        report.retained_len,
        report.original_len
    );
    Ok((kept, report))
}

/// Tukey filter over a bare population of values, order preserved.
pub fn filter_values_by_iqr(values: &[f64], multiplier: f64) -> Result<Vec<f64>> {
    check_multiplier(multiplier)?;
    let (lower, upper) = estimate_quartiles_with(values, QuartileMethod::SplitMedian)?
        .fences(multiplier);
    Ok(retained_indices(values, lower, upper)
        .into_iter()
        .map(|i| values[i])
        .collect())
}

/// Indices of the values inside `[lower, upper]`.
///
/// Written as two `<=` comparisons so that a NaN value (or NaN fence) is
/// never inside.
pub fn retained_indices(values: &[f64], lower: f64, upper: f64) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| lower <= v && v <= upper)
        .map(|(i, _)| i)
        .collect()
}

fn check_multiplier(multiplier: f64) -> Result<()> {
    if multiplier.is_finite() && multiplier >= 0.0 {
        Ok(())
    } else {
        Err(HyperspecError::InvalidMultiplier(multiplier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(values: &[f64]) -> Vec<PixelRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| PixelRecord::new(i / 4, i % 4, v))
            .collect()
    }

    #[test]
    fn test_filter_removes_outliers_and_keeps_order() {
        // q1 = 2, q3 = 7, iqr = 5 -> fences [-3, 12]
        let input = records(&[5.0, 1.0, 100.0, 8.0, 3.0, -50.0, 7.0, 2.0, 4.0, 6.0]);
        let kept = filter_by_iqr(&input, 1.0).unwrap();
        let values: Vec<f64> = kept.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![5.0, 1.0, 8.0, 3.0, 7.0, 2.0, 4.0, 6.0]);
        // identity survives
        assert_eq!((kept[2].row, kept[2].col), (0, 3));
        assert_eq!((kept[3].row, kept[3].col), (1, 0));
    }

    #[test]
    fn test_exact_fence_values_retained() {
        // sorted [0, 1, 3, 4, 4.5, 5, 7, 8]: q1 = 2, q3 = 6, iqr = 4
        let input = records(&[4.0, 0.0, 7.0, 1.0, 8.0, 3.0, 4.5, 5.0]);

        // m = 0.5 -> fences [0, 8]: both extremes sit exactly on a fence
        let kept = filter_by_iqr(&input, 0.5).unwrap();
        assert_eq!(kept, input);

        // m = 0.25 -> fences [1, 7]: 1 and 7 stay, 0 and 8 go
        let kept = filter_by_iqr(&input, 0.25).unwrap();
        let values: Vec<f64> = kept.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![4.0, 7.0, 1.0, 3.0, 4.5, 5.0]);

        let idx = retained_indices(&[-1.0, 0.0, 7.0, 7.0000001], -1.0, 7.0);
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_multiplier_is_quartile_window() {
        let input = records(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let kept = filter_by_iqr(&input, 0.0).unwrap();
        let values: Vec<f64> = kept.iter().map(|r| r.value).collect();
        // window [2.5, 6.5]
        assert_eq!(values, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_retained_set_grows_with_multiplier() {
        let values: Vec<f64> = (0..200)
            .map(|i| ((i as f64) * 0.37).sin() * (i as f64 % 17.0))
            .collect();
        let input = records(&values);
        let mut previous = 0;
        for m in [0.0, 0.25, 0.5, 1.0, 1.5, 3.0, 10.0] {
            let kept = filter_by_iqr(&input, m).unwrap();
            assert!(kept.len() >= previous, "m = {m} shrank the set");
            previous = kept.len();
        }
    }

    #[test]
    fn test_nan_never_retained() {
        let input = records(&[1.0, f64::NAN, 2.0, 3.0, f64::NAN, 4.0]);
        let kept = filter_by_iqr(&input, 100.0).unwrap();
        assert_eq!(kept.len(), 4);
        assert!(kept.iter().all(|r| !r.value.is_nan()));
    }

    #[test]
    fn test_all_nan_collection_keeps_nothing() {
        let input = vec![PixelRecord::new(0, 0, f64::NAN), PixelRecord::new(0, 1, f64::NAN)];
        assert_eq!(filter_by_iqr(&input, 1.0), Ok(vec![]));

        let (kept, report) =
            filter_by_iqr_with_report(&input, 1.0, QuartileMethod::SplitMedian).unwrap();
        assert!(kept.is_empty());
        assert!(report.lower_fence.is_nan() && report.upper_fence.is_nan());
        assert_eq!(report.percent_removed(), 100.0);

        assert!(filter_values_by_iqr(&[f64::NAN], 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_multiplier() {
        let input = records(&[1.0, 2.0, 3.0]);
        assert_eq!(
            filter_by_iqr(&input, -0.5),
            Err(HyperspecError::InvalidMultiplier(-0.5))
        );
        assert!(matches!(
            filter_by_iqr(&input, f64::NAN),
            Err(HyperspecError::InvalidMultiplier(_))
        ));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert_eq!(filter_by_iqr(&[], 1.0), Err(HyperspecError::EmptyPopulation));
    }

    #[test]
    fn test_report_percent_removed() {
        let input = records(&[5.0, 1.0, 100.0, 8.0, 3.0, -50.0, 7.0, 2.0, 4.0, 6.0]);
        let (_, report) =
            filter_by_iqr_with_report(&input, 1.0, QuartileMethod::SplitMedian).unwrap();
        assert_eq!(report.original_len, 10);
        assert_eq!(report.retained_len, 8);
        assert_eq!(report.removed_len(), 2);
        assert!((report.percent_removed() - 20.0).abs() < 1e-9);
        assert_eq!(percent_removed(0, 0), 0.0);
    }

    #[test]
    fn test_filter_values_variant() {
        let kept = filter_values_by_iqr(&[5.0, 1.0, 100.0, 8.0, 3.0, -50.0, 7.0, 2.0, 4.0, 6.0], 1.0)
            .unwrap();
        assert_eq!(kept, vec![5.0, 1.0, 8.0, 3.0, 7.0, 2.0, 4.0, 6.0]);
    }
}
