//! Density-based clustering.
//!
//! A point's neighbourhood includes itself and every point at distance
//! `<= eps`. Points with at least `min_samples` neighbours are core points.
//! Clusters grow from core points in index order; border points take the
//! label of the first cluster that reaches them. Everything else is noise.

pub struct Dbscan {
    eps: f64,
    min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Returns a label per point, `None` for noise. Labels are dense and
    /// numbered in order of first appearance.
    pub fn fit<T, D>(&self, points: &[T], distance: D) -> Vec<Option<usize>>
    where
        D: Fn(&T, &T) -> f64,
    {
        let n = points.len();
        let neighbours: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| i == j || distance(&points[i], &points[j]) <= self.eps)
                    .collect()
            })
            .collect();
        let is_core: Vec<bool> = neighbours
            .iter()
            .map(|nb| nb.len() >= self.min_samples)
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut next_label = 0;
        for seed in 0..n {
            if labels[seed].is_some() || !is_core[seed] {
                continue;
            }
            labels[seed] = Some(next_label);
            let mut stack = vec![seed];
            while let Some(p) = stack.pop() {
                for &q in &neighbours[p] {
                    if labels[q].is_none() {
                        labels[q] = Some(next_label);
                        if is_core[q] {
                            stack.push(q);
                        }
                    }
                }
            }
            next_label += 1;
        }
        labels
    }
}

/// Member indices per label, in label order. Noise is dropped.
pub fn group_by_label(labels: &[Option<usize>]) -> Vec<Vec<usize>> {
    let count = labels.iter().flatten().map(|l| l + 1).max().unwrap_or(0);
    let mut groups = vec![Vec::new(); count];
    for (idx, label) in labels.iter().enumerate() {
        if let Some(label) = label {
            groups[*label].push(idx);
        }
    }
    groups
}
