//! Feature arrows: one 2-D vector per feature, pointing towards the
//! part of the layout where the feature is significantly enriched.

use nalgebra_glm as glm;

use log::debug;

use crate::error::{ColorError, Result};

/// Number of permutations behind the upstream significance scores;
/// the smallest attainable p-value is `1 / (N + 1)`
pub const REFERENCE_SAMPLE_COUNT: f64 = 5000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowOptions {
    /// Length of the arrow of the most significant feature
    pub max_length: f64,
    /// Scores weaker than this p-value are ignored
    pub pvalue: f64,
}

impl std::default::Default for ArrowOptions {
    fn default() -> Self {
        Self {
            max_length: 1.0,
            pvalue: 0.05,
        }
    }
}

impl ArrowOptions {
    /// The significance score corresponding to `pvalue`
    pub fn score_threshold(&self) -> f64 {
        let min_pvalue = 1.0 / (REFERENCE_SAMPLE_COUNT + 1.0);
        self.pvalue.ln() / min_pvalue.ln()
    }
}

/// Node-by-feature significance scores; row `i` belongs to the `i`th
/// node of the graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignificanceTable {
    features: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl SignificanceTable {
    pub fn new(features: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((ix, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != features.len())
        {
            return Err(ColorError::invalid_argument(format!(
                "significance row {} has {} scores, expected {}",
                ix,
                row.len(),
                features.len()
            )));
        }

        Ok(Self { features, rows })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn node_count(&self) -> usize {
        self.rows.len()
    }
}

/// Per-feature arrows, in the feature order of the source table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureArrowSet {
    pub arrows: Vec<(String, glm::DVec2)>,
    /// Largest absolute feature mass, which the relative importances
    /// were divided by
    pub normalization: f64,
    /// Score threshold derived from the p-value
    pub threshold: f64,
}

impl FeatureArrowSet {
    pub fn get(&self, feature: &str) -> Option<glm::DVec2> {
        self.arrows
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, v)| *v)
    }
}

/// Divides every value by the largest absolute value; all-zero input
/// is returned as is. Returns the divisor.
fn max_abs_scale(values: &mut [f64]) -> f64 {
    let max_abs = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));

    if max_abs > 0.0 {
        values.iter_mut().for_each(|v| *v /= max_abs);
        max_abs
    } else {
        1.0
    }
}

/// Projects each feature of `table` onto the layout given by
/// `positions`.
///
/// Scores below the p-value threshold are dropped, each node's
/// remaining scores are scaled by their row maximum, and each feature's
/// arrow is the score-weighted mean node position. Arrows are then
/// rescaled so the feature with the largest total score has length
/// `max_length` and the others are proportionally shorter.
pub fn project_arrows(
    table: &SignificanceTable,
    positions: &[glm::DVec2],
    options: &ArrowOptions,
) -> Result<FeatureArrowSet> {
    if table.node_count() != positions.len() {
        return Err(ColorError::invalid_argument(format!(
            "significance table has {} nodes but {} positions were given",
            table.node_count(),
            positions.len()
        )));
    }

    let threshold = options.score_threshold();
    let feature_count = table.features().len();
    let node_count = positions.len();

    let masked: Vec<Vec<f64>> = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|&s| if s >= threshold { s } else { 0.0 })
                .collect()
        })
        .collect();

    let mut centers = vec![glm::vec2(0.0, 0.0); feature_count];

    for (row, pos) in masked.iter().zip(positions) {
        let mut weights = row.clone();
        max_abs_scale(&mut weights);

        for (center, w) in centers.iter_mut().zip(weights) {
            *center += pos * w;
        }
    }

    if node_count > 0 {
        centers.iter_mut().for_each(|c| *c /= node_count as f64);
    }

    let mut importance: Vec<f64> = (0..feature_count)
        .map(|f| masked.iter().map(|row| row[f]).sum())
        .collect();
    let normalization = max_abs_scale(&mut importance);

    let arrows = table
        .features()
        .iter()
        .zip(centers)
        .zip(importance)
        .map(|((name, center), amplitude)| {
            let magnitude = glm::length(&center);

            let arrow = if magnitude > 0.0 {
                center * (options.max_length * amplitude / magnitude)
            } else {
                glm::vec2(0.0, 0.0)
            };

            (name.clone(), arrow)
        })
        .collect::<Vec<_>>();

    debug!(
        "projected {} feature arrows over {} nodes, score threshold {:.4}",
        arrows.len(),
        node_count,
        threshold
    );

    Ok(FeatureArrowSet {
        arrows,
        normalization,
        threshold,
    })
}
