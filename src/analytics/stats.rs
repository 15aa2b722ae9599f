//! Null-safe numeric statistics. Non-finite inputs are excluded — never
//! coerced to zero — and every undersized computation is an explicit
//! `None`, never NaN or a panic.

use std::collections::HashMap;

use crate::config;

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    let xs = finite(values);
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Median; the average of the middle two on even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut xs = finite(values);
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(f64::total_cmp);
    let mid = xs.len() / 2;
    if xs.len() % 2 == 1 {
        Some(xs[mid])
    } else {
        Some((xs[mid - 1] + xs[mid]) / 2.0)
    }
}

/// Sample standard deviation (n−1 denominator); undefined below two
/// observations.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let xs = finite(values);
    if xs.len() < config::MIN_STD_SAMPLE {
        return None;
    }
    let m = xs.iter().sum::<f64>() / xs.len() as f64;
    let variance = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Cohen's d with pooled standard deviation; undefined when either sample
/// is below two observations or the pooled deviation is zero.
pub fn cohen_d(a: &[f64], b: &[f64]) -> Option<f64> {
    let xs = finite(a);
    let ys = finite(b);
    if xs.len() < config::MIN_STD_SAMPLE || ys.len() < config::MIN_STD_SAMPLE {
        return None;
    }
    let mx = mean(&xs)?;
    let my = mean(&ys)?;
    let sx = std_dev(&xs)?;
    let sy = std_dev(&ys)?;
    let nx = xs.len() as f64;
    let ny = ys.len() as f64;
    let pooled =
        (((nx - 1.0) * sx * sx + (ny - 1.0) * sy * sy) / (nx + ny - 2.0)).sqrt();
    if !pooled.is_finite() || pooled == 0.0 {
        return None;
    }
    Some((mx - my) / pooled)
}

/// Pearson correlation over pairwise-complete observations; undefined
/// below three complete pairs or when either side has zero variance.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < config::MIN_CORRELATION_PAIRS {
        return None;
    }

    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let mx = mean(&xs)?;
    let my = mean(&ys)?;
    let sx = std_dev(&xs)?;
    let sy = std_dev(&ys)?;
    if sx == 0.0 || sy == 0.0 {
        return None;
    }

    let cov = pairs
        .iter()
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / (pairs.len() - 1) as f64;
    Some(cov / (sx * sy))
}

/// Top-k labels by frequency, in stable descending order: ties keep the
/// order labels were first observed in.
pub fn top_k<I>(labels: I, k: usize) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, (usize, u64)> = HashMap::new();
    let mut next_rank = 0usize;
    for label in labels {
        let entry = counts.entry(label).or_insert_with(|| {
            let rank = next_rank;
            next_rank += 1;
            (rank, 0)
        });
        entry.1 += 1;
    }

    let mut ranked: Vec<(String, usize, u64)> = counts
        .into_iter()
        .map(|(label, (rank, count))| (label, rank, count))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));
    ranked
        .into_iter()
        .take(k)
        .map(|(label, _, count)| (label, count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_ignores_non_finite_and_handles_empty() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[f64::NAN, f64::INFINITY]), None);
        assert_eq!(mean(&[1.0, 2.0, f64::NAN, 3.0]), Some(2.0));
    }

    #[test]
    fn median_averages_middle_pair_on_even_counts() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[5.0]), Some(5.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn std_dev_needs_two_observations() {
        assert_eq!(std_dev(&[]), None);
        assert_eq!(std_dev(&[1.0]), None);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138).abs() < 0.001);
    }

    #[test]
    fn cohen_d_undefined_on_small_or_flat_samples() {
        assert_eq!(cohen_d(&[1.0], &[1.0, 2.0]), None);
        // zero pooled deviation
        assert_eq!(cohen_d(&[3.0, 3.0], &[3.0, 3.0]), None);

        let d = cohen_d(&[2.0, 4.0, 6.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(d > 0.0);
    }

    #[test]
    fn cohen_d_matches_hand_computation() {
        // means 4 and 2, pooled sd = sqrt(((2)*4 + (2)*1)/4) = sqrt(2.5)
        let d = cohen_d(&[2.0, 4.0, 6.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((d - 2.0 / 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn pearson_requires_three_complete_pairs() {
        let x = [Some(1.0), Some(2.0), None, Some(3.0)];
        let y = [Some(1.0), None, Some(2.0), Some(3.0)];
        // only two complete pairs survive
        assert_eq!(pearson(&x, &y), None);
    }

    #[test]
    fn pearson_detects_perfect_correlation() {
        let x = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let y = [Some(2.0), Some(4.0), Some(6.0), Some(8.0)];
        let r = pearson(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let inverse = [Some(8.0), Some(6.0), Some(4.0), Some(2.0)];
        let r = pearson(&x, &inverse).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_undefined_on_zero_variance() {
        let x = [Some(1.0), Some(1.0), Some(1.0)];
        let y = [Some(2.0), Some(4.0), Some(6.0)];
        assert_eq!(pearson(&x, &y), None);
    }

    #[test]
    fn top_k_is_stable_on_ties() {
        let labels = ["b", "a", "b", "c", "a", "b"]
            .iter()
            .map(|s| s.to_string());
        let top = top_k(labels, 2);
        assert_eq!(top, vec![("b".to_string(), 3), ("a".to_string(), 2)]);

        // tie between x and y resolves by first observation
        let tied = ["y", "x", "y", "x"].iter().map(|s| s.to_string());
        let top = top_k(tied, 2);
        assert_eq!(top[0].0, "y");
        assert_eq!(top[1].0, "x");
    }
}
