/// Computes the `q`-quantile of an ascending sample by linear interpolation
/// between the closest ranks.
///
/// With `pos = (n - 1) * q`, the result interpolates between
/// `sorted[floor(pos)]` and the following element. `q` is clamped to
/// `[0, 1]`. An empty sample yields `0.0`.
///
/// The caller must sort the sample ascending first.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(
        sorted.is_sorted_by(|a, b| a <= b),
        "values must be sorted in ascending order"
    );
    if sorted.is_empty() {
        return 0.0;
    }

    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match sorted.get(base + 1) {
        Some(next) => sorted[base] + rest * (next - sorted[base]),
        None => sorted[base],
    }
}
