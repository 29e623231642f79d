// Stats module - reductions applied to every descriptor

/// Arithmetic mean and population variance of `values`
///
/// Accumulates in f64 and narrows the results to f32. Returns `None` for an
/// empty slice, where neither statistic is defined.
pub fn mean_var(values: &[f32]) -> Option<(f32, f32)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    Some((mean as f32, var as f32))
}

/// Median of `values` (mean of the two middle values for even lengths)
pub fn median(values: &mut [f32]) -> Option<f32> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    let (_, &mut upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    if n % 2 == 1 {
        return Some(upper);
    }

    let lower = values[..mid]
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    Some((lower + upper) / 2.0)
}
