use serde::Serialize;

use crate::config::HistogramConfig;

/// One fixed-width bin of the total-score histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Inclusive bounds for integral scores, e.g. `"300-349"`.
    pub label: String,
    pub left: f64,
    pub count: usize,
}

/// Buckets totals into contiguous bins of `config.bin_width` points.
///
/// Bins are aligned to multiples of the width and span from the bin holding
/// the lowest total (or the configured floor, whichever is lower) to the bin
/// holding the highest total. A total `s` lands in the bin with
/// `left <= s < left + width`. Empty bins inside the span are kept so chart
/// axes stay contiguous. A non-positive or non-finite width yields no bins.
pub fn histogram(totals: &[f64], config: &HistogramConfig) -> Vec<HistogramBin> {
    let width = config.bin_width;
    if !(width.is_finite() && width > 0.0) {
        return vec![];
    }
    let (Some(min), Some(max)) = (
        totals.iter().copied().reduce(f64::min),
        totals.iter().copied().reduce(f64::max),
    ) else {
        return vec![];
    };

    let align = |value: f64| (value / width).floor() * width;
    let mut start = align(min);
    if let Some(floor) = config.floor {
        start = start.min(align(floor));
    }
    let bin_count = ((max - start) / width).floor() as usize + 1;

    let mut bins = (0..bin_count)
        .map(|idx| {
            let left = start + idx as f64 * width;
            HistogramBin {
                label: format!("{}-{}", left, left + width - 1.0),
                left,
                count: 0,
            }
        })
        .collect::<Vec<_>>();

    for &total in totals {
        let idx = ((total - start) / width).floor() as usize;
        bins[idx.min(bin_count - 1)].count += 1;
    }

    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(bins: &[HistogramBin]) -> Vec<&str> {
        bins.iter().map(|bin| bin.label.as_str()).collect()
    }

    #[test]
    fn bins_are_contiguous_and_include_empty_ones() {
        let totals = [312.0, 349.0, 350.0, 455.0, 499.0];
        let bins = histogram(&totals, &HistogramConfig::default());
        assert_eq!(labels(&bins), ["300-349", "350-399", "400-449", "450-499"]);
        let counts: Vec<usize> = bins.iter().map(|bin| bin.count).collect();
        assert_eq!(counts, [2, 1, 0, 2]);
    }

    #[test]
    fn counts_sum_to_input_len() {
        let totals = [701.0, 388.5, 402.0, 640.0, 750.0, 512.0, 512.0, 333.0];
        let bins = histogram(&totals, &HistogramConfig::default());
        let sum: usize = bins.iter().map(|bin| bin.count).sum();
        assert_eq!(sum, totals.len());
        assert_eq!(bins.last().unwrap().label, "750-799");
    }

    #[test]
    fn fractional_scores_stay_in_their_bin() {
        let bins = histogram(&[349.5, 350.0], &HistogramConfig::default());
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 1);
    }

    #[test]
    fn floor_pins_the_first_bin() {
        let config = HistogramConfig {
            bin_width: 50.0,
            floor: Some(300.0),
        };
        let bins = histogram(&[420.0], &config);
        assert_eq!(labels(&bins), ["300-349", "350-399", "400-449"]);
        assert_eq!(bins[2].count, 1);

        // Totals below the floor still get a bin.
        let bins = histogram(&[280.0], &config);
        assert_eq!(labels(&bins), ["250-299"]);
    }

    #[test]
    fn empty_and_single_inputs() {
        assert!(histogram(&[], &HistogramConfig::default()).is_empty());

        let bins = histogram(&[612.0], &HistogramConfig::default());
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].label, "600-649");
        assert_eq!(bins[0].left, 600.0);
        assert_eq!(bins[0].count, 1);
    }

    #[test]
    fn degenerate_width_yields_no_bins() {
        for bin_width in [0.0, -50.0, f64::NAN] {
            let config = HistogramConfig {
                bin_width,
                floor: None,
            };
            assert!(histogram(&[420.0, 610.0], &config).is_empty());
        }
    }
}
