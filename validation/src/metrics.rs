//! Discrimination and calibration metrics of a binary classifier.
//!
//! Curves follow the conventions of the widely used statistics libraries so that
//! published results are comparable with those computed elsewhere: the ROC
//! curve starts at `(0, 0)` with an infinite threshold and drops collinear
//! points, the precision/recall curve runs from full recall to `(1, 0)`, and
//! calibration uses ten uniform bins with empty bins omitted.

use serde::Serialize;
use tracing::warn;

use crate::error::{Result, ValidationError};

const CALIBRATION_BINS: usize = 10;

/// Receiver operating characteristic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    /// False positive rates, increasing.
    pub fpr: Vec<f64>,
    /// True positive rates, increasing.
    pub tpr: Vec<f64>,
    /// Decreasing score thresholds; the first is infinite.
    pub thresholds: Vec<f64>,
}

/// Precision against recall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecisionRecallCurve {
    /// Precision values; the last is 1.
    pub precision: Vec<f64>,
    /// Decreasing recall values; the last is 0.
    pub recall: Vec<f64>,
    /// Increasing thresholds, one fewer than the points.
    pub thresholds: Vec<f64>,
}

/// Observed outcome rate against mean predicted probability per bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationCurve {
    /// Fraction of positives in each non-empty bin.
    pub prob_true: Vec<f64>,
    /// Mean predicted probability in each non-empty bin.
    pub prob_pred: Vec<f64>,
}

/// Performance of a model on one validation cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Number of scored rows with an observed outcome.
    pub sample_count: usize,
    /// Area under the ROC curve.
    pub auc: f64,
    /// Mean squared error of the predicted probabilities.
    pub brier_score: f64,
    /// Precision/recall curve.
    pub precision_recall_curve: PrecisionRecallCurve,
    /// ROC curve.
    pub roc_curve: RocCurve,
    /// Calibration curve; absent when it cannot be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration_curve: Option<CalibrationCurve>,
}

impl PerformanceMetrics {
    /// Computes all metrics for observed labels `y_true` (0 or 1) and
    /// predicted probabilities `y_prob`.
    ///
    /// A calibration curve that cannot be computed is logged and left out.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Metric`] if the inputs are empty or of
    /// different length, a label is not 0 or 1, a score is not finite, or
    /// only one class is present.
    pub fn compute(y_true: &[f64], y_prob: &[f64]) -> Result<Self> {
        check_inputs(y_true, y_prob)?;

        let roc_curve = roc_curve(y_true, y_prob);
        let auc = trapezoid(&roc_curve.fpr, &roc_curve.tpr);
        let calibration_curve = match calibration_curve(y_true, y_prob, CALIBRATION_BINS) {
            Ok(curve) => Some(curve),
            Err(e) => {
                warn!(error = %e, "calibration curve omitted");
                None
            }
        };

        Ok(Self {
            sample_count: y_true.len(),
            auc,
            brier_score: brier_score(y_true, y_prob),
            precision_recall_curve: precision_recall_curve(y_true, y_prob),
            roc_curve,
            calibration_curve,
        })
    }
}

fn check_inputs(y_true: &[f64], y_prob: &[f64]) -> Result<()> {
    if y_true.is_empty() {
        return Err(ValidationError::metric("sample", "no scored rows"));
    }
    if y_true.len() != y_prob.len() {
        return Err(ValidationError::metric(
            "sample",
            format!("{} labels for {} scores", y_true.len(), y_prob.len()),
        ));
    }
    if let Some(label) = y_true.iter().find(|&&y| y != 0.0 && y != 1.0) {
        return Err(ValidationError::metric("labels", format!("{label} is not 0 or 1")));
    }
    if let Some(score) = y_prob.iter().find(|p| !p.is_finite()) {
        return Err(ValidationError::metric("scores", format!("{score} is not finite")));
    }
    let positives = y_true.iter().filter(|&&y| y == 1.0).count();
    if positives == 0 || positives == y_true.len() {
        return Err(ValidationError::metric(
            "auc",
            "only one class present in the outcome",
        ));
    }
    Ok(())
}

/// Cumulative false and true positives at each distinct threshold, highest
/// threshold first.
struct ClassifierCounts {
    fps: Vec<f64>,
    tps: Vec<f64>,
    thresholds: Vec<f64>,
}

fn classifier_counts(y_true: &[f64], y_prob: &[f64]) -> ClassifierCounts {
    let mut order: Vec<usize> = (0..y_prob.len()).collect();
    order.sort_by(|&a, &b| y_prob[b].total_cmp(&y_prob[a]));

    let mut counts = ClassifierCounts {
        fps: Vec::new(),
        tps: Vec::new(),
        thresholds: Vec::new(),
    };
    let mut tp = 0.0;
    for (rank, &i) in order.iter().enumerate() {
        tp += y_true[i];
        let last_of_tie = order
            .get(rank + 1)
            .map_or(true, |&next| y_prob[next] != y_prob[i]);
        if last_of_tie {
            counts.tps.push(tp);
            counts.fps.push((rank + 1) as f64 - tp);
            counts.thresholds.push(y_prob[i]);
        }
    }
    counts
}

fn roc_curve(y_true: &[f64], y_prob: &[f64]) -> RocCurve {
    let counts = classifier_counts(y_true, y_prob);

    // Keep the end points and every corner of the curve.
    let n = counts.fps.len();
    let bends = |x: &[f64], i: usize| x[i + 1] - 2.0 * x[i] + x[i - 1] != 0.0;
    let keep: Vec<usize> = (0..n)
        .filter(|&i| {
            n <= 2
                || i == 0
                || i == n - 1
                || bends(counts.fps.as_slice(), i)
                || bends(counts.tps.as_slice(), i)
        })
        .collect();

    let mut fps = vec![0.0];
    let mut tps = vec![0.0];
    let mut thresholds = vec![f64::INFINITY];
    for i in keep {
        fps.push(counts.fps[i]);
        tps.push(counts.tps[i]);
        thresholds.push(counts.thresholds[i]);
    }

    let negatives = fps.last().copied().unwrap_or(1.0);
    let positives = tps.last().copied().unwrap_or(1.0);
    RocCurve {
        fpr: fps.iter().map(|f| f / negatives).collect(),
        tpr: tps.iter().map(|t| t / positives).collect(),
        thresholds,
    }
}

fn precision_recall_curve(y_true: &[f64], y_prob: &[f64]) -> PrecisionRecallCurve {
    let counts = classifier_counts(y_true, y_prob);
    let positives = counts.tps.last().copied().unwrap_or(1.0);

    let mut precision: Vec<f64> = counts
        .tps
        .iter()
        .zip(&counts.fps)
        .rev()
        .map(|(tp, fp)| tp / (tp + fp))
        .collect();
    precision.push(1.0);
    let mut recall: Vec<f64> = counts.tps.iter().rev().map(|tp| tp / positives).collect();
    recall.push(0.0);
    let thresholds = counts.thresholds.into_iter().rev().collect();

    PrecisionRecallCurve {
        precision,
        recall,
        thresholds,
    }
}

fn calibration_curve(y_true: &[f64], y_prob: &[f64], bins: usize) -> Result<CalibrationCurve> {
    if let Some(p) = y_prob.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(ValidationError::metric(
            "calibration_curve",
            format!("probability {p} outside [0, 1]"),
        ));
    }

    let width = 1.0 / bins as f64;
    let inner_edges: Vec<f64> = (1..bins).map(|i| i as f64 * width).collect();
    let mut sums = vec![0.0; bins];
    let mut positives = vec![0.0; bins];
    let mut totals = vec![0usize; bins];
    for (&y, &p) in y_true.iter().zip(y_prob) {
        let bin = inner_edges.partition_point(|&edge| edge < p);
        sums[bin] += p;
        positives[bin] += y;
        totals[bin] += 1;
    }

    let mut curve = CalibrationCurve {
        prob_true: Vec::new(),
        prob_pred: Vec::new(),
    };
    for bin in (0..bins).filter(|&b| totals[b] > 0) {
        let total = totals[bin] as f64;
        curve.prob_true.push(positives[bin] / total);
        curve.prob_pred.push(sums[bin] / total);
    }
    Ok(curve)
}

fn brier_score(y_true: &[f64], y_prob: &[f64]) -> f64 {
    let squared: f64 = y_true
        .iter()
        .zip(y_prob)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    squared / y_true.len() as f64
}

fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(dx, dy)| (dx[1] - dx[0]) * (dy[0] + dy[1]) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const Y: [f64; 4] = [0.0, 0.0, 1.0, 1.0];
    const P: [f64; 4] = [0.1, 0.4, 0.35, 0.8];

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn roc_curve_and_auc() {
        let metrics = PerformanceMetrics::compute(&Y, &P).unwrap();
        assert_eq!(metrics.sample_count, 4);
        assert!((metrics.auc - 0.75).abs() < 1e-12);
        assert!(close(&metrics.roc_curve.fpr, &[0.0, 0.0, 0.5, 0.5, 1.0]));
        assert!(close(&metrics.roc_curve.tpr, &[0.0, 0.5, 0.5, 1.0, 1.0]));
        assert!(metrics.roc_curve.thresholds[0].is_infinite());
        assert!(close(&metrics.roc_curve.thresholds[1..], &[0.8, 0.4, 0.35, 0.1]));
    }

    #[test]
    fn precision_recall_curve_ends_at_full_precision() {
        let curve = PerformanceMetrics::compute(&Y, &P).unwrap().precision_recall_curve;
        assert!(close(&curve.precision, &[0.5, 2.0 / 3.0, 0.5, 1.0, 1.0]));
        assert!(close(&curve.recall, &[1.0, 1.0, 0.5, 0.5, 0.0]));
        assert!(close(&curve.thresholds, &[0.1, 0.35, 0.4, 0.8]));
    }

    #[test]
    fn brier_score_is_mean_squared_error() {
        let metrics = PerformanceMetrics::compute(&Y, &P).unwrap();
        assert!((metrics.brier_score - 0.158_125).abs() < 1e-12);
    }

    #[test]
    fn calibration_uses_uniform_bins() {
        let curve = PerformanceMetrics::compute(&Y, &P)
            .unwrap()
            .calibration_curve
            .unwrap();
        assert!(close(&curve.prob_true, &[0.0, 0.5, 1.0]));
        assert!(close(&curve.prob_pred, &[0.1, 0.375, 0.8]));
    }

    #[test]
    fn collinear_roc_points_are_dropped() {
        let y = [1.0, 1.0, 1.0, 0.0, 0.0];
        let p = [0.9, 0.8, 0.7, 0.2, 0.1];
        let roc = PerformanceMetrics::compute(&y, &p).unwrap().roc_curve;
        assert!(close(&roc.fpr, &[0.0, 0.0, 0.0, 1.0]));
        assert!(close(&roc.tpr, &[0.0, 1.0 / 3.0, 1.0, 1.0]));
    }

    #[test]
    fn tied_scores_share_one_threshold() {
        let y = [1.0, 0.0, 0.0, 1.0];
        let p = [0.5, 0.5, 0.2, 0.9];
        let metrics = PerformanceMetrics::compute(&y, &p).unwrap();
        assert!(close(&metrics.precision_recall_curve.thresholds, &[0.2, 0.5, 0.9]));
        assert!((metrics.auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_probabilities_omit_calibration_only() {
        let metrics = PerformanceMetrics::compute(&Y, &[0.1, 0.4, 0.35, 1.8]).unwrap();
        assert!(metrics.calibration_curve.is_none());
        assert!((metrics.auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(PerformanceMetrics::compute(&[], &[]).is_err());
        assert!(PerformanceMetrics::compute(&[0.0, 1.0], &[0.5]).is_err());
        assert!(PerformanceMetrics::compute(&[0.0, 2.0], &[0.5, 0.5]).is_err());
        assert!(PerformanceMetrics::compute(&[1.0, 1.0], &[0.2, 0.7]).is_err());
        let err = PerformanceMetrics::compute(&[0.0, 1.0], &[f64::NAN, 0.5]).unwrap_err();
        assert!(matches!(err, ValidationError::Metric { metric: "scores", .. }));
    }
}
