use serde::Serialize;

use super::distribution::subject_series;
use super::rates::mean;
use crate::models::{ScoreRecord, Subject};

/// One cell of the subject correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub x: &'static str,
    pub y: &'static str,
    pub value: f64,
}

/// Pearson correlation with population statistics.
///
/// Returns `0.0` when the series differ in length, hold fewer than two
/// values, or either has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 || is_constant(xs) || is_constant(ys) {
        return 0.0;
    }

    let n = xs.len() as f64;
    let (mx, my) = (mean(xs), mean(ys));
    let cov = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / n;
    let var_x = xs.iter().map(|x| (x - mx).powi(2)).sum::<f64>() / n;
    let var_y = ys.iter().map(|y| (y - my).powi(2)).sum::<f64>() / n;
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

// The mean of a constant fractional series can round away from its
// elements, so the variance alone does not detect it.
fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&value| value == values[0])
}

/// Full `subjects x subjects` matrix in row-major catalog order.
///
/// The diagonal is exactly `1.0`; each off-diagonal value is computed once
/// and mirrored, so the matrix is symmetric bit for bit.
pub fn correlations(records: &[ScoreRecord], subjects: &[Subject]) -> Vec<Correlation> {
    let series: Vec<Vec<f64>> = subjects
        .iter()
        .map(|&subject| subject_series(records, subject))
        .collect();

    let n = subjects.len();
    let mut matrix = vec![vec![1.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let value = pearson(&series[i], &series[j]);
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }

    subjects
        .iter()
        .enumerate()
        .flat_map(|(i, x)| {
            let row = &matrix[i];
            subjects.iter().enumerate().map(move |(j, y)| Correlation {
                x: x.label(),
                y: y.label(),
                value: row[j],
            })
        })
        .collect()
}
