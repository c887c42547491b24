use rustc_hash::FxHashMap;

use log::warn;

use crate::error::{ColorError, Result};
use crate::graph::Graph;
use crate::target::{Granularity, Target, TargetKind};

/// Reduces a target to one scalar per graph node, in graph node order.
///
/// Sample-level numerical targets take the NaN-ignoring mean of each
/// node's samples, categorical targets take the most frequent code.
/// Node-level targets are looked up by node id directly.
pub fn aggregate(target: &Target, graph: &Graph) -> Result<Vec<f64>> {
    let values = target.values();

    let result = match target.granularity() {
        Granularity::ByNode => graph
            .node_ids()
            .iter()
            .map(|id| {
                values.get(id.0).copied().ok_or_else(|| {
                    ColorError::invalid_argument(format!(
                        "node {} is missing from a node-level target \
                         of length {}",
                        id,
                        values.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        Granularity::BySample => {
            let mut result = Vec::with_capacity(graph.node_count());

            for (id, samples) in
                graph.node_ids().iter().zip(graph.node_samples())
            {
                let mut node_values = Vec::with_capacity(samples.len());
                for &ix in samples {
                    let v = values.get(ix).copied().ok_or_else(|| {
                        ColorError::invalid_argument(format!(
                            "node {} contains sample {}, but the target \
                             has {} samples",
                            id,
                            ix,
                            values.len()
                        ))
                    })?;
                    node_values.push(v);
                }

                let value = match target.kind() {
                    TargetKind::Numerical => nan_mean(&node_values),
                    TargetKind::Categorical => mode(&node_values),
                };

                result.push(value);
            }

            result
        }
    };

    let nan_nodes = result.iter().filter(|v| !v.is_finite()).count();
    if nan_nodes > 0 {
        warn!(
            "{} of {} nodes have no finite target value, check the input data",
            nan_nodes,
            result.len()
        );
    }

    Ok(result)
}

/// Arithmetic mean of the non-NaN values; NaN if there are none
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Most frequent value; ties go to the smallest value. NaN entries are
/// not counted, and NaN is returned if nothing else remains.
pub fn mode(values: &[f64]) -> f64 {
    let mut counts: FxHashMap<u64, usize> = FxHashMap::default();

    for v in values.iter().filter(|v| !v.is_nan()) {
        // normalize -0.0 so it counts together with 0.0
        let v = if *v == 0.0 { 0.0 } else { *v };
        *counts.entry(v.to_bits()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(bits, count)| (f64::from_bits(bits), count))
        .fold(None, |best: Option<(f64, usize)>, (v, count)| match best {
            Some((best_v, best_count))
                if best_count > count
                    || (best_count == count && best_v < v) =>
            {
                Some((best_v, best_count))
            }
            _ => Some((v, count)),
        })
        .map(|(v, _)| v)
        .unwrap_or(f64::NAN)
}
