use std::ops::Range;

use crate::contract::Target;
use crate::materialize::FeatureRow;
use crate::model::PropModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub samples: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub within_1: f64,
    pub within_2: f64,
    pub within_3: f64,
    pub within_5: f64,
}

impl RegressionMetrics {
    fn empty() -> Self {
        Self {
            samples: 0,
            mae: 0.0,
            rmse: 0.0,
            r2: 0.0,
            within_1: 0.0,
            within_2: 0.0,
            within_3: 0.0,
            within_5: 0.0,
        }
    }
}

pub fn evaluate_predictions(predictions: &[f64], actuals: &[f64]) -> RegressionMetrics {
    if predictions.is_empty() || predictions.len() != actuals.len() {
        return RegressionMetrics::empty();
    }
    let n = actuals.len() as f64;
    let mean_actual = actuals.iter().sum::<f64>() / n;

    let mut abs_sum = 0.0_f64;
    let mut sq_sum = 0.0_f64;
    let mut total_ss = 0.0_f64;
    let mut within = [0usize; 4];
    for (p, y) in predictions.iter().zip(actuals) {
        let err = (p - y).abs();
        abs_sum += err;
        sq_sum += err * err;
        total_ss += (y - mean_actual).powi(2);
        for (count, limit) in within.iter_mut().zip([1.0, 2.0, 3.0, 5.0]) {
            if err <= limit {
                *count += 1;
            }
        }
    }
    // Constant actuals leave R² undefined; report 0 like a mean predictor.
    let r2 = if total_ss > 0.0 {
        1.0 - sq_sum / total_ss
    } else {
        0.0
    };
    RegressionMetrics {
        samples: actuals.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        r2,
        within_1: within[0] as f64 / n,
        within_2: within[1] as f64 / n,
        within_3: within[2] as f64 / n,
        within_5: within[3] as f64 / n,
    }
}

pub fn evaluate_model(
    model: &dyn PropModel,
    rows: &[&FeatureRow],
    target: Target,
) -> anyhow::Result<(RegressionMetrics, usize)> {
    let mut predictions = Vec::with_capacity(rows.len());
    let mut actuals = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for row in rows {
        match model.predict(&row.vector(target))? {
            Some(p) => {
                predictions.push(p);
                actuals.push(row.actual(target));
            }
            None => skipped += 1,
        }
    }
    Ok((evaluate_predictions(&predictions, &actuals), skipped))
}

pub fn train_split_index(n: usize, train_fraction: f64) -> usize {
    if n <= 2 {
        return n.min(1);
    }
    let idx = ((n as f64) * train_fraction.clamp(0.0, 1.0)).floor() as usize;
    idx.clamp(1, n - 1)
}

pub fn chronological_split(rows: &[FeatureRow], train_fraction: f64) -> (Vec<&FeatureRow>, Vec<&FeatureRow>) {
    let mut ordered: Vec<&FeatureRow> = rows.iter().collect();
    ordered.sort_by(|a, b| {
        a.game_date
            .cmp(&b.game_date)
            .then(a.player_id.cmp(&b.player_id))
            .then_with(|| a.game_id.cmp(&b.game_id))
    });
    let split = train_split_index(ordered.len(), train_fraction);
    let test = ordered.split_off(split);
    (ordered, test)
}

pub fn time_series_folds(n: usize, folds: usize) -> Vec<(Range<usize>, Range<usize>)> {
    if folds == 0 || n < folds + 1 {
        return Vec::new();
    }
    let test_size = n / (folds + 1);
    let first_test = n - folds * test_size;
    (0..folds)
        .map(|k| {
            let start = first_test + k * test_size;
            (0..start, start..start + test_size)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_score_perfectly() {
        let y = [10.0, 20.0, 30.0];
        let m = evaluate_predictions(&y, &y);
        assert_eq!(m.samples, 3);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert!((m.r2 - 1.0).abs() < 1e-12);
        assert_eq!(m.within_1, 1.0);
    }

    #[test]
    fn hit_rates_use_inclusive_limits() {
        let m = evaluate_predictions(&[11.0, 12.5, 17.0, 30.0], &[10.0, 10.0, 10.0, 10.0]);
        assert_eq!(m.within_1, 0.25);
        assert_eq!(m.within_3, 0.5);
        assert_eq!(m.within_5, 0.5);
        assert_eq!(m.r2, 0.0);
        assert!((m.mae - (1.0 + 2.5 + 7.0 + 20.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn folds_expand_and_never_overlap() {
        let folds = time_series_folds(12, 5);
        assert_eq!(folds.len(), 5);
        assert_eq!(folds[0], (0..2, 2..4));
        assert_eq!(folds[4], (0..10, 10..12));
        for (train, test) in &folds {
            assert_eq!(train.end, test.start);
        }
        assert!(time_series_folds(4, 5).is_empty());
    }

    #[test]
    fn split_index_keeps_both_sides() {
        assert_eq!(train_split_index(10, 0.8), 8);
        assert_eq!(train_split_index(3, 0.99), 2);
        assert_eq!(train_split_index(3, 0.0), 1);
        assert_eq!(train_split_index(1, 0.8), 1);
    }
}
