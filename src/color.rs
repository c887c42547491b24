use rustc_hash::FxHashMap;

#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::error::{ColorError, Result};
use crate::graph::{Graph, NodeId};
use crate::hue::{ColorScheme, HexColor};
use crate::rescale::rescale;
use crate::target::{Granularity, Target, TargetKind};

/// Color used for entities whose value is NaN or infinite
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NanColor {
    /// Such values are placed in the bottom band, like the smallest value
    MinimumBand,
    Fixed(HexColor),
}

impl std::default::Default for NanColor {
    fn default() -> Self {
        NanColor::MinimumBand
    }
}

/// A caller-supplied label to color table for categorical targets,
/// validated when it is built
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPalette {
    colors: FxHashMap<String, HexColor>,
    fallback: HexColor,
}

impl CategoryPalette {
    /// Parses every color up front; unmapped labels are drawn in blue
    pub fn new<I, L, C>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (L, C)>,
        L: Into<String>,
        C: AsRef<str>,
    {
        let colors = entries
            .into_iter()
            .map(|(label, color)| -> Result<(String, HexColor)> {
                let color: HexColor = color.as_ref().parse()?;
                Ok((label.into(), color))
            })
            .collect::<Result<FxHashMap<_, _>>>()?;

        Ok(Self {
            colors,
            fallback: HexColor::BLUE,
        })
    }

    pub fn with_fallback(mut self, fallback: HexColor) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn color(&self, label: &str) -> HexColor {
        self.colors.get(label).copied().unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> HexColor {
        self.fallback
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorOptions {
    pub scheme: ColorScheme,
    pub palette: Option<CategoryPalette>,
    pub nan_color: NanColor,
}

/// Colors for every sample or every node, in entity order
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAssignment {
    granularity: Granularity,
    colors: Vec<(usize, HexColor)>,
    index: FxHashMap<usize, usize>,
}

impl ColorAssignment {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn colors(&self) -> &[(usize, HexColor)] {
        &self.colors
    }

    pub fn get(&self, id: usize) -> Option<HexColor> {
        let ix = *self.index.get(&id)?;
        self.colors.get(ix).map(|(_, color)| *color)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// One entity's value, its position on the color scale, and the
/// resulting color
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub value: f64,
    pub position: f64,
    pub color: HexColor,
    pub label: Option<String>,
}

/// Lookup from values and rescaled positions to colors, used to
/// build colorbars and categorical legends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }

    /// The color drawn for a rescaled position, if any entity has it
    pub fn color_at(&self, position: f64) -> Option<HexColor> {
        self.entries
            .iter()
            .find(|e| e.position == position)
            .map(|e| e.color)
    }

    /// Distinct finite values in ascending order with their colors
    pub fn colorbar(&self) -> Vec<(f64, HexColor)> {
        let mut stops: Vec<(f64, HexColor)> = self
            .entries
            .iter()
            .filter(|e| e.value.is_finite())
            .map(|e| (e.value, e.color))
            .collect();

        stops.sort_by(|a, b| {
            a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)
        });
        stops.dedup_by(|a, b| a.0 == b.0);
        stops
    }

    /// Distinct labels in sorted order with their colors
    pub fn categories(&self) -> Vec<(String, HexColor)> {
        let mut cats: Vec<(String, HexColor)> = self
            .entries
            .iter()
            .filter_map(|e| e.label.as_ref().map(|l| (l.clone(), e.color)))
            .collect();

        cats.sort_by(|a, b| a.0.cmp(&b.0));
        cats.dedup_by(|a, b| a.0 == b.0);
        cats
    }

    /// Smallest and largest finite value
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.entries
            .iter()
            .map(|e| e.value)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Formats a colorbar bound with two decimals, switching to
/// scientific notation (`5.00e-04`) for values below 0.001, negative
/// values included
pub fn format_bound(value: f64) -> String {
    if value * 100.0 >= 0.1 {
        return format!("{:.2}", value);
    }

    let sci = format!("{:.2e}", value);
    match sci.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => sci,
    }
}

/// Evenly spaced positions for the sorted distinct labels; a single
/// label sits at 0
fn category_ladder(labels: &[String]) -> FxHashMap<&str, f64> {
    let steps = labels.len().saturating_sub(1);

    labels
        .iter()
        .enumerate()
        .map(|(ix, label)| {
            let position = if steps == 0 {
                0.0
            } else {
                ix as f64 / steps as f64
            };
            (label.as_str(), position)
        })
        .collect()
}

fn nan_aware(options: &ColorOptions, value: f64, position: f64) -> HexColor {
    match options.nan_color {
        NanColor::Fixed(color) if !value.is_finite() => color,
        _ => options.scheme.color(position),
    }
}

fn numerical_entries(
    values: &[f64],
    options: &ColorOptions,
) -> Vec<LegendEntry> {
    let positions = rescale(values);

    values
        .iter()
        .zip(positions)
        .map(|(&value, position)| LegendEntry {
            value,
            position,
            color: nan_aware(options, value, position),
            label: None,
        })
        .collect()
}

fn categorical_entries(
    target: &Target,
    codes: &[f64],
    options: &ColorOptions,
) -> Result<Vec<LegendEntry>> {
    let encoding = target.encoding().ok_or_else(|| {
        ColorError::invalid_state("categorical target has no label encoding")
    })?;

    let ladder = category_ladder(encoding.labels());

    let entries = codes
        .iter()
        .map(|&value| match encoding.decode_value(value) {
            Some(label) => {
                let position = ladder.get(label).copied().unwrap_or(0.0);
                let color = match &options.palette {
                    Some(palette) => palette.color(label),
                    None => options.scheme.color(position),
                };
                LegendEntry {
                    value,
                    position,
                    color,
                    label: Some(label.to_string()),
                }
            }
            None => LegendEntry {
                value,
                position: 0.0,
                color: nan_aware(options, f64::NAN, 0.0),
                label: None,
            },
        })
        .collect();

    Ok(entries)
}

fn split_entries(
    ids: impl Iterator<Item = usize>,
    granularity: Granularity,
    entries: Vec<LegendEntry>,
) -> (ColorAssignment, Legend) {
    let colors: Vec<(usize, HexColor)> =
        ids.zip(entries.iter()).map(|(id, e)| (id, e.color)).collect();

    let index = colors
        .iter()
        .enumerate()
        .map(|(ix, (id, _))| (*id, ix))
        .collect();

    (
        ColorAssignment {
            granularity,
            colors,
            index,
        },
        Legend { entries },
    )
}

/// Colors every node of `graph` from a sample- or node-level target.
///
/// Numerical targets are averaged per node and quartile-rescaled onto
/// the color scheme. Categorical targets take each node's most common
/// label and color it from the label ladder or the caller's palette.
pub fn node_colors(
    target: &Target,
    graph: &Graph,
    options: &ColorOptions,
) -> Result<(ColorAssignment, Legend)> {
    let node_values = aggregate(target, graph)?;

    let entries = match target.kind() {
        TargetKind::Numerical => numerical_entries(&node_values, options),
        TargetKind::Categorical => {
            categorical_entries(target, &node_values, options)?
        }
    };

    debug!("assigned colors to {} nodes", entries.len());

    Ok(split_entries(
        graph.node_ids().iter().map(|id| id.0),
        Granularity::ByNode,
        entries,
    ))
}

/// Colors every sample of a sample-level target
pub fn sample_colors(
    target: &Target,
    options: &ColorOptions,
) -> Result<(ColorAssignment, Legend)> {
    if target.granularity() != Granularity::BySample {
        return Err(ColorError::invalid_state(
            "sample colors require a target declared by sample",
        ));
    }

    let entries = match target.kind() {
        TargetKind::Numerical => numerical_entries(target.values(), options),
        TargetKind::Categorical => {
            categorical_entries(target, target.values(), options)?
        }
    };

    debug!("assigned colors to {} samples", entries.len());

    Ok(split_entries(0..target.len(), Granularity::BySample, entries))
}

/// Colors each edge with the color of its first endpoint
pub fn edge_colors(
    graph: &Graph,
    nodes: &ColorAssignment,
) -> Result<Vec<((NodeId, NodeId), HexColor)>> {
    if nodes.granularity() != Granularity::ByNode {
        return Err(ColorError::invalid_state(
            "edge colors require a node color assignment",
        ));
    }

    graph
        .edges()
        .iter()
        .map(|&(a, b)| {
            let color = nodes.get(a.0).ok_or_else(|| {
                ColorError::invalid_argument(format!("node {} has no color", a))
            })?;
            Ok(((a, b), color))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::line_graph;
    use crate::hue::hue_color;
    use crate::target::{RawTarget, RawValue};

    #[test]
    fn numerical_node_colors() {
        let graph = line_graph();
        let target =
            Target::numerical(vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0]).unwrap();

        let (colors, legend) =
            node_colors(&target, &graph, &ColorOptions::default()).unwrap();

        assert_eq!(colors.granularity(), Granularity::ByNode);
        assert_eq!(colors.len(), 3);

        // node means are 2, 5, 10
        assert_eq!(colors.get(0), Some(hue_color(0.0)));
        assert_eq!(colors.get(2), Some(hue_color(1.0)));

        assert_eq!(legend.bounds(), Some((2.0, 10.0)));
        assert_eq!(legend.color_at(1.0), Some(hue_color(1.0)));
        assert_eq!(legend.colorbar().len(), 3);
    }

    #[test]
    fn categorical_node_colors_use_the_ladder() {
        let graph = line_graph();
        let target =
            Target::categorical(vec!["a", "b", "a", "a", "c", "b"]).unwrap();

        let (colors, legend) =
            node_colors(&target, &graph, &ColorOptions::default()).unwrap();

        // modes are a, a, b on a three step ladder
        assert_eq!(colors.get(0), Some(hue_color(0.0)));
        assert_eq!(colors.get(1), Some(hue_color(0.0)));
        assert_eq!(colors.get(2), Some(hue_color(0.5)));

        let cats = legend.categories();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0], ("a".to_string(), hue_color(0.0)));
        assert_eq!(cats[1], ("b".to_string(), hue_color(0.5)));
    }

    #[test]
    fn sample_colors_for_categories() {
        let target = Target::categorical(vec!["x", "y", "z", "x"]).unwrap();

        let (colors, legend) =
            sample_colors(&target, &ColorOptions::default()).unwrap();

        assert_eq!(colors.granularity(), Granularity::BySample);
        assert_eq!(colors.get(0), Some(hue_color(0.0)));
        assert_eq!(colors.get(1), Some(hue_color(0.5)));
        assert_eq!(colors.get(2), Some(hue_color(1.0)));
        assert_eq!(colors.get(3), colors.get(0));

        assert_eq!(legend.categories().len(), 3);
    }

    #[test]
    fn single_category_sits_at_the_bottom() {
        let target = Target::categorical(vec!["only", "only"]).unwrap();
        let (colors, _) =
            sample_colors(&target, &ColorOptions::default()).unwrap();

        assert_eq!(colors.get(1), Some(hue_color(0.0)));
    }

    #[test]
    fn palette_overrides_the_ladder() {
        let target = Target::categorical(vec!["x", "y", "z"]).unwrap();

        let palette = CategoryPalette::new(vec![("x", "#112233"), ("y", "red")])
            .unwrap();
        let options = ColorOptions {
            palette: Some(palette),
            ..ColorOptions::default()
        };

        let (colors, _) = sample_colors(&target, &options).unwrap();

        assert_eq!(colors.get(0), Some(HexColor::new(0x11, 0x22, 0x33)));
        assert_eq!(colors.get(1), Some(HexColor::RED));
        assert_eq!(colors.get(2), Some(HexColor::BLUE));
    }

    #[test]
    fn palette_colors_are_validated() {
        assert!(matches!(
            CategoryPalette::new(vec![("x", "#12")]),
            Err(ColorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn sample_colors_need_sample_targets() {
        let mut map = FxHashMap::default();
        map.insert(0, RawValue::from("a"));
        let target =
            Target::new(RawTarget::ByNode(map), TargetKind::Categorical)
                .unwrap();

        assert!(matches!(
            sample_colors(&target, &ColorOptions::default()),
            Err(ColorError::InvalidState(_))
        ));
    }

    #[test]
    fn nan_nodes_follow_the_policy() {
        let graph = line_graph();
        let target = Target::numerical(vec![
            1.0,
            2.0,
            3.0,
            4.0,
            f64::NAN,
            f64::NAN,
        ])
        .unwrap();

        let (colors, _) =
            node_colors(&target, &graph, &ColorOptions::default()).unwrap();
        assert_eq!(colors.get(2), Some(hue_color(0.0)));

        let grey = ColorOptions {
            nan_color: NanColor::Fixed(HexColor::GREY),
            ..ColorOptions::default()
        };
        let (colors, _) = node_colors(&target, &graph, &grey).unwrap();
        assert_eq!(colors.get(2), Some(HexColor::GREY));
    }

    #[test]
    fn infinite_values_follow_the_nan_policy() {
        let target = Target::numerical(vec![
            1.0,
            2.0,
            3.0,
            f64::INFINITY,
        ])
        .unwrap();

        let (colors, legend) =
            sample_colors(&target, &ColorOptions::default()).unwrap();
        assert_eq!(colors.get(3), Some(hue_color(0.0)));
        assert_eq!(colors.get(2), Some(hue_color(1.0)));
        assert_eq!(legend.bounds(), Some((1.0, 3.0)));

        let grey = ColorOptions {
            nan_color: NanColor::Fixed(HexColor::GREY),
            ..ColorOptions::default()
        };
        let (colors, _) = sample_colors(&target, &grey).unwrap();
        assert_eq!(colors.get(3), Some(HexColor::GREY));
        assert_eq!(colors.get(9), None);
    }

    #[test]
    fn constant_target_is_one_color() {
        let graph = line_graph();
        let target = Target::numerical(vec![2.5; 6]).unwrap();

        let (colors, _) =
            node_colors(&target, &graph, &ColorOptions::default()).unwrap();

        assert!(colors.colors().iter().all(|(_, c)| *c == hue_color(1.0)));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let graph = line_graph();
        let target =
            Target::numerical(vec![0.3, -1.0, 8.0, 2.0, 2.0, 5.5]).unwrap();
        let options = ColorOptions::default();

        let first = node_colors(&target, &graph, &options).unwrap();
        let second = node_colors(&target, &graph, &options).unwrap();
        assert_eq!(first, second);

        let render = |a: &ColorAssignment| {
            a.colors()
                .iter()
                .map(|(id, c)| format!("{}\t{}", id, c))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(render(&first.0), render(&second.0));
    }

    #[test]
    fn edges_take_the_first_endpoint_color() {
        let graph = line_graph();
        let target =
            Target::numerical(vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0]).unwrap();

        let (colors, _) =
            node_colors(&target, &graph, &ColorOptions::default()).unwrap();
        let edges = edge_colors(&graph, &colors).unwrap();

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].1, colors.get(0).unwrap());
        assert_eq!(edges[1].1, colors.get(1).unwrap());

        let (samples, _) =
            sample_colors(&target, &ColorOptions::default()).unwrap();
        assert!(edge_colors(&graph, &samples).is_err());
    }

    #[test]
    fn bound_formatting() {
        assert_eq!(format_bound(3.14159), "3.14");
        assert_eq!(format_bound(0.0005), "5.00e-04");
        assert_eq!(format_bound(0.0), "0.00e+00");
        assert_eq!(format_bound(-3.0), "-3.00e+00");
        assert_eq!(format_bound(1.5e-12), "1.50e-12");
    }
}
