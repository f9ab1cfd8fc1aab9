//! Binary classification metrics

use crate::{Error, Result};

/// Probabilities are clipped to `[EPS, 1 - EPS]` for log-loss
const LOG_LOSS_EPS: f64 = 1e-15;

fn check_lengths(labels: &[u8], values: &[f64]) -> Result<()> {
    if labels.len() != values.len() {
        return Err(Error::Training(format!(
            "{} labels but {} predictions",
            labels.len(),
            values.len()
        )));
    }
    if labels.is_empty() {
        return Err(Error::Training("cannot score an empty set".to_string()));
    }
    Ok(())
}

/// Area under the ROC curve
///
/// Computed from the Mann-Whitney U statistic; tied scores get their
/// average rank. Undefined (an error) when only one class is present.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Result<f64> {
    check_lengths(labels, scores)?;

    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(Error::Training(
            "ROC-AUC is undefined when only one class is present".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; ties share the mean rank
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| labels[i] == 1).count();
        positive_rank_sum += mean_rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Fraction of matching labels
pub fn accuracy(labels: &[u8], predicted: &[u8]) -> Result<f64> {
    if labels.len() != predicted.len() || labels.is_empty() {
        return Err(Error::Training(format!(
            "cannot compare {} labels with {} predictions",
            labels.len(),
            predicted.len()
        )));
    }
    let correct = labels.iter().zip(predicted).filter(|(a, b)| a == b).count();
    Ok(correct as f64 / labels.len() as f64)
}

/// Mean binary cross-entropy of positive-class probabilities
pub fn log_loss(labels: &[u8], probabilities: &[f64]) -> Result<f64> {
    check_lengths(labels, probabilities)?;
    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(&label, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    Ok(total / labels.len() as f64)
}
