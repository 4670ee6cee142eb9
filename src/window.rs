use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingSpec {
    pub window: usize,
    pub min_periods: usize,
}

impl RollingSpec {
    pub const fn new(window: usize, min_periods: usize) -> Self {
        Self {
            window,
            min_periods,
        }
    }
}

pub fn window_mean(history: &[Option<f64>], spec: RollingSpec) -> Option<f64> {
    let (sum, count) = trailing(history, spec.window)
        .iter()
        .flatten()
        .fold((0.0_f64, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 || count < spec.min_periods {
        return None;
    }
    Some(sum / count as f64)
}

pub fn window_std(history: &[Option<f64>], spec: RollingSpec) -> Option<f64> {
    let observed: Vec<f64> = trailing(history, spec.window)
        .iter()
        .flatten()
        .copied()
        .collect();
    if observed.len() < spec.min_periods.max(2) {
        return None;
    }
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let ss = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some((ss / (n - 1.0)).sqrt())
}

pub fn expanding_mean(history: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = history
        .iter()
        .flatten()
        .fold((0.0_f64, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn prior_rolling_mean(values: &[Option<f64>], spec: RollingSpec) -> Vec<Option<f64>> {
    (0..=values.len())
        .map(|i| window_mean(&values[..i], spec))
        .collect()
}

pub fn prior_rolling_std(values: &[Option<f64>], spec: RollingSpec) -> Vec<Option<f64>> {
    (0..=values.len())
        .map(|i| window_std(&values[..i], spec))
        .collect()
}

/// Running form of [`expanding_mean`]; the additions happen in the same
/// order, so slot `i` is bit-identical to `expanding_mean(&values[..i])`.
pub fn prior_expanding_mean(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len() + 1);
    let mut sum = 0.0_f64;
    let mut count = 0usize;
    for value in values {
        out.push((count > 0).then(|| sum / count as f64));
        if let Some(v) = value {
            sum += v;
            count += 1;
        }
    }
    out.push((count > 0).then(|| sum / count as f64));
    out
}

pub fn offset_ratio(numerator: Option<f64>, denominator: Option<f64>, offset: f64) -> Option<f64> {
    Some(numerator? / (denominator? + offset))
}

pub fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

pub fn sorted_positions<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
    order
}

pub fn group_runs<G: PartialEq>(
    order: &[usize],
    group_of: impl Fn(usize) -> G,
) -> Vec<std::ops::Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0usize;
    for idx in 1..=order.len() {
        if idx == order.len() || group_of(order[idx]) != group_of(order[start]) {
            if start < idx {
                runs.push(start..idx);
            }
            start = idx;
        }
    }
    runs
}

fn trailing(history: &[Option<f64>], window: usize) -> &[Option<f64>] {
    &history[history.len().saturating_sub(window)..]
}
