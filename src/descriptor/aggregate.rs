use crate::error::{DtrError, Result};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// How the stacked group-mean matrix is renormalised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NormalizationScope {
    /// One shared constant over the whole stacked matrix. Matches the
    /// behaviour of the system this crate reproduces.
    #[default]
    WholeMatrix,
    /// Each group row divided by its own L2 norm.
    PerRow,
}

/// Result of aggregating descriptors by group label.
#[derive(Debug, Clone)]
pub struct GroupSummary<T> {
    /// One renormalised mean descriptor per distinct label, stacked in sorted
    /// label order.
    pub means: Array2<f32>,
    /// Distinct labels, ascending.
    pub labels: Vec<String>,
    /// Index into the full input of each group's medoid, aligned to `labels`.
    pub medoid_indices: Vec<usize>,
    /// Attribute row of each group's medoid, aligned to `labels`. Present
    /// only when a side-table was supplied.
    pub representatives: Option<Vec<T>>,
}

/// Cosine similarity between two descriptors.
///
/// Fails with `DegenerateInput` when either vector has zero norm rather than
/// silently yielding NaN.
pub fn cosine_similarity(x: ArrayView1<f32>, y: ArrayView1<f32>) -> Result<f32> {
    if x.len() != y.len() {
        return Err(DtrError::InvalidInput(format!(
            "descriptor lengths differ: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let norm_x = x.dot(&x).sqrt();
    let norm_y = y.dot(&y).sqrt();
    if norm_x == 0.0 || norm_y == 0.0 {
        return Err(DtrError::DegenerateInput(
            "cosine similarity of a zero-norm descriptor".to_string(),
        ));
    }
    Ok(x.dot(&y) / (norm_x * norm_y))
}

/// Aggregate an `[N, M]` descriptor matrix by group label.
///
/// Returns per-group mean descriptors in ascending label order, each group's
/// medoid (the member with maximum total cosine similarity to the rest of its
/// group, ties broken towards the lowest original index), and, when an
/// aligned attribute side-table is supplied, the medoid's attribute row per
/// group.
pub fn aggregate_by_group<T: Clone>(
    descriptors: ArrayView2<f32>,
    labels: &[&str],
    attributes: Option<&[T]>,
    scope: NormalizationScope,
) -> Result<GroupSummary<T>> {
    let rows = descriptors.nrows();
    if rows == 0 {
        return Err(DtrError::InvalidInput(
            "no descriptors to aggregate".to_string(),
        ));
    }
    if labels.len() != rows {
        return Err(DtrError::InvalidInput(format!(
            "{} labels for {} descriptors",
            labels.len(),
            rows
        )));
    }
    if let Some(table) = attributes {
        if table.len() != rows {
            return Err(DtrError::InvalidInput(format!(
                "{} attribute rows for {} descriptors",
                table.len(),
                rows
            )));
        }
    }

    let mut sorted_labels: Vec<&str> = labels.to_vec();
    sorted_labels.sort_unstable();
    sorted_labels.dedup();

    let mut means = Array2::<f32>::zeros((sorted_labels.len(), descriptors.ncols()));
    for (group_idx, &label) in sorted_labels.iter().enumerate() {
        let mut count = 0usize;
        for (row_idx, &row_label) in labels.iter().enumerate() {
            if row_label == label {
                let mut mean_row = means.row_mut(group_idx);
                mean_row += &descriptors.row(row_idx);
                count += 1;
            }
        }
        // Every sorted label came from `labels`, so count >= 1.
        means
            .row_mut(group_idx)
            .mapv_inplace(|v| v / count as f32);
    }

    match scope {
        NormalizationScope::WholeMatrix => {
            let norm = means.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm == 0.0 {
                return Err(DtrError::DegenerateInput(
                    "group means have zero norm".to_string(),
                ));
            }
            means.mapv_inplace(|v| v / norm);
        }
        NormalizationScope::PerRow => {
            for mut row in means.rows_mut() {
                let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm == 0.0 {
                    return Err(DtrError::DegenerateInput(
                        "a group mean has zero norm".to_string(),
                    ));
                }
                row.mapv_inplace(|v| v / norm);
            }
        }
    }

    let medoid_indices = group_medoids(descriptors, labels, &sorted_labels)?;
    let representatives = attributes
        .map(|table| {
            medoid_indices
                .iter()
                .map(|&idx| table[idx].clone())
                .collect()
        });

    debug!(
        "Aggregated {} descriptors into {} groups",
        rows,
        sorted_labels.len()
    );

    Ok(GroupSummary {
        means,
        labels: sorted_labels.iter().map(|s| s.to_string()).collect(),
        medoid_indices,
        representatives,
    })
}

/// Medoid index (into the full input) for each label in `sorted_labels`.
fn group_medoids(
    descriptors: ArrayView2<f32>,
    labels: &[&str],
    sorted_labels: &[&str],
) -> Result<Vec<usize>> {
    let mut medoids = Vec::with_capacity(sorted_labels.len());
    for &label in sorted_labels {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == label)
            .map(|(idx, _)| idx)
            .collect();

        if members.len() == 1 {
            medoids.push(members[0]);
            continue;
        }

        let mut best_index = members[0];
        let mut best_total = f32::NEG_INFINITY;
        for &candidate in &members {
            let mut total = 0.0f32;
            for &other in &members {
                if other != candidate {
                    total += cosine_similarity(
                        descriptors.row(candidate),
                        descriptors.row(other),
                    )?;
                }
            }
            // Strict comparison over ascending indices breaks ties low.
            if total > best_total {
                best_total = total;
                best_index = candidate;
            }
        }
        medoids.push(best_index);
    }
    Ok(medoids)
}

/// Consume a vector and return its unit-norm counterpart.
pub(crate) fn l2_normalized(mut v: Array1<f32>) -> Result<Array1<f32>> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return Err(DtrError::DegenerateInput(
            "cannot normalise a zero-norm descriptor".to_string(),
        ));
    }
    v.mapv_inplace(|x| x / norm);
    Ok(v)
}
