use anyhow::{Result, anyhow, bail};
use ndarray::Array1;
use statrs::statistics::Statistics;

/// Fractional change of each close from the previous one.
///
/// Undefined at position 0, after a missing close, and where the prior close
/// is zero. Non-finite results are reported as undefined too.
pub fn pct_change(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return changes;
    }

    changes.push(None);
    for w in closes.windows(2) {
        let change = match (w[0], w[1]) {
            (Some(prev), Some(curr)) if prev != 0.0 => Some((curr - prev) / prev),
            _ => None,
        };
        changes.push(change.filter(|c| c.is_finite()));
    }
    changes
}

/// Simple returns with every undefined value clamped to 0 ("no move")
pub fn simple_returns(closes: &[Option<f64>]) -> Vec<f64> {
    pct_change(closes)
        .into_iter()
        .map(|r| r.unwrap_or(0.0))
        .collect()
}

/// Shift a series forward by `lag` positions; the first `lag` entries are undefined
pub fn lag<T: Copy>(values: &[T], lag: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| i.checked_sub(lag).map(|j| values[j]))
        .collect()
}

/// Trailing sample standard deviation over `window` values.
///
/// Undefined for the first `window - 1` positions.
pub fn rolling_std(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    if window < 2 {
        return Err(anyhow!(
            "Rolling standard deviation needs a window of at least 2, got {}",
            window
        ));
    }

    let mut result = vec![None; values.len()];
    if values.len() < window {
        return Ok(result);
    }

    for (offset, slice) in values.windows(window).enumerate() {
        let std_dev = slice.std_dev();
        result[offset + window - 1] = std_dev.is_finite().then_some(std_dev);
    }
    Ok(result)
}

/// Weighted sum of equally long series. A position is undefined when any
/// contributing series is undefined there.
pub fn weighted_sum(series: &[Vec<Option<f64>>], weights: &[f64]) -> Result<Vec<Option<f64>>> {
    if series.len() != weights.len() {
        bail!(
            "Got {} series but {} weights",
            series.len(),
            weights.len()
        );
    }
    let Some(len) = series.first().map(Vec::len) else {
        bail!("Weighted sum needs at least one series");
    };
    if let Some(bad) = series.iter().find(|s| s.len() != len) {
        bail!(
            "Series lengths differ: expected {}, found {}",
            len,
            bad.len()
        );
    }

    let mut combined = Array1::<f64>::zeros(len);
    for (values, &weight) in series.iter().zip(weights) {
        let values = Array1::from_iter(values.iter().map(|v| v.unwrap_or(f64::NAN)));
        combined.scaled_add(weight, &values);
    }

    Ok(combined
        .iter()
        .map(|v| v.is_finite().then_some(*v))
        .collect())
}
