//! Plain text readers and writers for the command line tool.
//!
//! All inputs are whitespace separated, one record per line; blank
//! lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use bstr::ByteSlice;
use nalgebra_glm as glm;
use rustc_hash::FxHashMap;

use log::info;

use crate::arrows::{FeatureArrowSet, SignificanceTable};
use crate::color::{
    format_bound, CategoryPalette, ColorAssignment, Legend,
};
use crate::error::{ColorError, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::hue::HexColor;
use crate::target::{Granularity, RawTarget, RawValue};

pub fn open<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let file = File::open(path)?;
    Ok(BufReader::new(file))
}

fn parse_error<S: Into<String>>(line: usize, details: S) -> ColorError {
    ColorError::Parse {
        line,
        details: details.into(),
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    field: Option<&str>,
    what: &str,
) -> Result<T> {
    let field =
        field.ok_or_else(|| parse_error(line, format!("missing {}", what)))?;
    field
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {} '{}'", what, field)))
}

/// Calls `f` with the line number and fields of every record line
fn for_each_record<R, F>(mut reader: R, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, Vec<&str>) -> Result<()>,
{
    let mut buf: Vec<u8> = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();

        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let line = buf.trim();
        if line.is_empty() || line.starts_with(b"#") {
            continue;
        }

        let fields = line
            .fields()
            .map(|field| {
                field
                    .to_str()
                    .map_err(|_| parse_error(line_no, "invalid UTF-8"))
            })
            .collect::<Result<Vec<_>>>()?;

        f(line_no, fields)?;
    }

    Ok(())
}

/// Reads a target: one value per line for sample-level targets, or
/// `node value` lines for node-level targets
pub fn read_target<R: BufRead>(
    reader: R,
    granularity: Granularity,
) -> Result<RawTarget> {
    match granularity {
        Granularity::BySample => {
            let mut values = Vec::new();
            for_each_record(reader, |_, fields| {
                values.push(RawValue::parse(&fields.join(" ")));
                Ok(())
            })?;
            Ok(RawTarget::BySample(values))
        }
        Granularity::ByNode => {
            let mut values = FxHashMap::default();
            for_each_record(reader, |line, fields| {
                let node: usize =
                    parse_field(line, fields.first().copied(), "node id")?;
                if fields.len() < 2 {
                    return Err(parse_error(line, "missing value"));
                }
                let value = RawValue::parse(&fields[1..].join(" "));
                if values.insert(node, value).is_some() {
                    return Err(parse_error(
                        line,
                        format!("duplicate node {}", node),
                    ));
                }
                Ok(())
            })?;
            Ok(RawTarget::ByNode(values))
        }
    }
}

/// Reads `node x y [sample,sample,...]` lines and, optionally,
/// `node node` edge lines
pub fn read_graph<R, E>(nodes: R, edges: Option<E>) -> Result<Graph>
where
    R: BufRead,
    E: BufRead,
{
    let mut node_list = Vec::new();

    for_each_record(nodes, |line, fields| {
        let mut fields = fields.into_iter();

        let id: usize = parse_field(line, fields.next(), "node id")?;
        let x: f64 = parse_field(line, fields.next(), "x coordinate")?;
        let y: f64 = parse_field(line, fields.next(), "y coordinate")?;

        let samples = match fields.next() {
            Some(list) => list
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| parse_field(line, Some(s), "sample index"))
                .collect::<Result<Vec<usize>>>()?,
            None => Vec::new(),
        };

        node_list.push(Node {
            id: NodeId(id),
            position: glm::vec2(x, y),
            samples,
        });

        Ok(())
    })?;

    let mut edge_list = Vec::new();

    if let Some(edges) = edges {
        for_each_record(edges, |line, fields| {
            let a: usize =
                parse_field(line, fields.get(0).copied(), "edge source")?;
            let b: usize =
                parse_field(line, fields.get(1).copied(), "edge target")?;
            edge_list.push((NodeId(a), NodeId(b)));
            Ok(())
        })?;
    }

    info!(
        "loaded graph with {} nodes and {} edges",
        node_list.len(),
        edge_list.len()
    );

    Graph::from_nodes(node_list, edge_list)
}

/// Reads projected sample coordinates, one `x y` pair per line
pub fn read_projection<R: BufRead>(reader: R) -> Result<Vec<glm::DVec2>> {
    let mut points = Vec::new();

    for_each_record(reader, |line, fields| {
        let x: f64 =
            parse_field(line, fields.get(0).copied(), "x coordinate")?;
        let y: f64 =
            parse_field(line, fields.get(1).copied(), "y coordinate")?;
        points.push(glm::vec2(x, y));
        Ok(())
    })?;

    Ok(points)
}

/// Reads a significance table with a `node feature...` header and
/// `node score...` rows, reordered to match the graph's node order
pub fn read_significance<R: BufRead>(
    reader: R,
    graph: &Graph,
) -> Result<SignificanceTable> {
    let mut features: Option<Vec<String>> = None;
    let mut rows: FxHashMap<NodeId, Vec<f64>> = FxHashMap::default();

    for_each_record(reader, |line, fields| {
        if features.is_none() {
            features =
                Some(fields.iter().skip(1).map(|f| f.to_string()).collect());
            return Ok(());
        }
        let expected = features.as_ref().map(|h| h.len()).unwrap_or(0);

        let node: usize =
            parse_field(line, fields.first().copied(), "node id")?;
        let scores = fields
            .iter()
            .skip(1)
            .map(|f| parse_field::<f64>(line, Some(*f), "score"))
            .collect::<Result<Vec<_>>>()?;

        if scores.len() != expected {
            return Err(parse_error(
                line,
                format!("expected {} scores, found {}", expected, scores.len()),
            ));
        }

        rows.insert(NodeId(node), scores);
        Ok(())
    })?;

    let features = features.unwrap_or_default();

    let ordered = graph
        .node_ids()
        .iter()
        .map(|id| {
            rows.remove(id).ok_or_else(|| {
                ColorError::invalid_argument(format!(
                    "no significance scores for node {}",
                    id
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    SignificanceTable::new(features, ordered)
}

/// Reads `label color` lines into a palette; the label is everything
/// before the last field
pub fn read_palette<R: BufRead>(reader: R) -> Result<CategoryPalette> {
    let mut entries = Vec::new();

    for_each_record(reader, |line, fields| {
        match fields.split_last() {
            Some((color, label)) if !label.is_empty() => {
                entries.push((label.join(" "), color.to_string()));
                Ok(())
            }
            _ => Err(parse_error(line, "expected a label and a color")),
        }
    })?;

    CategoryPalette::new(entries)
}

/// Reads sample names, one per line, in sample order
pub fn read_sample_names<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for_each_record(reader, |_, fields| {
        names.push(fields.join(" "));
        Ok(())
    })?;

    Ok(names)
}

/// Writes one `id color` line per entity. Samples are keyed by name
/// when `sample_names` is given; nodes always by their id.
pub fn write_colors<W: Write>(
    out: &mut W,
    colors: &ColorAssignment,
    sample_names: Option<&[String]>,
) -> Result<()> {
    let names = match colors.granularity() {
        Granularity::BySample => sample_names,
        Granularity::ByNode => None,
    };

    for (id, color) in colors.colors() {
        match names {
            Some(names) => {
                let name = names.get(*id).ok_or_else(|| {
                    ColorError::invalid_argument(format!(
                        "sample {} has no name",
                        id
                    ))
                })?;
                writeln!(out, "{}\t{}", name, color)?;
            }
            None => writeln!(out, "{}\t{}", id, color)?,
        }
    }
    Ok(())
}

/// Writes the legend as comment lines: labels for categorical
/// targets, colorbar bounds otherwise. A minimum of zero is left out.
pub fn write_legend<W: Write>(out: &mut W, legend: &Legend) -> Result<()> {
    let categories = legend.categories();

    if !categories.is_empty() {
        for (label, color) in categories {
            writeln!(out, "# {}\t{}", label, color)?;
        }
    } else if let Some((min, max)) = legend.bounds() {
        let stops = legend.colorbar();
        let color_of = |v: f64| {
            stops
                .iter()
                .find(|(value, _)| *value == v)
                .map(|(_, c)| c.to_string())
                .unwrap_or_default()
        };
        if min != 0.0 {
            writeln!(out, "# min {}\t{}", format_bound(min), color_of(min))?;
        }
        writeln!(out, "# max {}\t{}", format_bound(max), color_of(max))?;
    }

    Ok(())
}

pub fn write_edge_colors<W: Write>(
    out: &mut W,
    edges: &[((NodeId, NodeId), HexColor)],
) -> Result<()> {
    for ((a, b), color) in edges {
        writeln!(out, "{}\t{}\t{}", a, b, color)?;
    }
    Ok(())
}

pub fn write_arrows<W: Write>(
    out: &mut W,
    arrows: &FeatureArrowSet,
) -> Result<()> {
    for (feature, v) in arrows.arrows.iter() {
        writeln!(out, "{}\t{}\t{}", feature, v.x, v.y)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::color::{node_colors, sample_colors, ColorOptions};
    use crate::target::{Target, TargetKind};

    const NODES: &str = "\
# node x y samples
0 0.0 0.0 0,1
1 1.0 0.0 1,2,3

2 2.0 1.0 4,5
";

    const EDGES: &str = "0 1\n1 2\n";

    fn graph() -> Graph {
        read_graph(NODES.as_bytes(), Some(EDGES.as_bytes())).unwrap()
    }

    #[test]
    fn graph_from_text() {
        let graph = graph();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node_samples()[1], vec![1, 2, 3]);
        assert_eq!(graph.positions()[2], glm::vec2(2.0, 1.0));
        assert_eq!(
            graph.edges(),
            &[(NodeId(0), NodeId(1)), (NodeId(1), NodeId(2))]
        );
    }

    #[test]
    fn malformed_node_line() {
        let result = read_graph("0 0.0 zero 1\n".as_bytes(), None::<&[u8]>);
        assert!(matches!(result, Err(ColorError::Parse { line: 1, .. })));
    }

    #[test]
    fn sample_and_node_targets() {
        let raw =
            read_target("1.5\nhigh\n\n3\n".as_bytes(), Granularity::BySample)
                .unwrap();
        assert_eq!(
            raw,
            RawTarget::BySample(vec![
                RawValue::Float(1.5),
                RawValue::Text("high".into()),
                RawValue::Int(3),
            ])
        );

        let raw =
            read_target("1 0.5\n0 0.25\n".as_bytes(), Granularity::ByNode)
                .unwrap();
        let target = Target::new(raw, TargetKind::Numerical).unwrap();
        assert_eq!(target.values(), &[0.25, 0.5]);

        let duplicate = "1 0.5\n1 0.25\n";
        assert!(
            read_target(duplicate.as_bytes(), Granularity::ByNode).is_err()
        );

        let huge = "18446744073709551615 1.0\n";
        let raw = read_target(huge.as_bytes(), Granularity::ByNode).unwrap();
        assert!(matches!(
            Target::new(raw, TargetKind::Numerical),
            Err(ColorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn significance_rows_follow_graph_order() {
        let text = "node f0 f1\n2 0.5 1.0\n0 1.0 0.0\n1 nan 2.0\n";
        let table = read_significance(text.as_bytes(), &graph()).unwrap();

        assert_eq!(table.features(), &["f0", "f1"]);
        assert_eq!(table.rows()[0], vec![1.0, 0.0]);
        assert_eq!(table.rows()[2], vec![0.5, 1.0]);
        assert!(table.rows()[1][0].is_nan());

        let missing = "node f0\n0 1.0\n";
        assert!(read_significance(missing.as_bytes(), &graph()).is_err());
    }

    #[test]
    fn palette_from_text() {
        let text = "high risk #ff0000\nlow #0000ff\n";
        let palette = read_palette(text.as_bytes()).unwrap();

        assert_eq!(palette.color("high risk"), HexColor::new(255, 0, 0));
        assert_eq!(palette.color("low"), HexColor::new(0, 0, 255));
        assert_eq!(palette.color("other"), palette.fallback());
    }

    #[test]
    fn projection_from_text() {
        let points = read_projection("0 1\n2.5 -1\n".as_bytes()).unwrap();
        assert_eq!(points, vec![glm::vec2(0.0, 1.0), glm::vec2(2.5, -1.0)]);
    }

    #[test]
    fn colors_and_legend_output() {
        let graph = graph();
        let target =
            Target::numerical(vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0]).unwrap();
        let (colors, legend) =
            node_colors(&target, &graph, &ColorOptions::default()).unwrap();

        let mut out: Vec<u8> = Vec::new();
        write_colors(&mut out, &colors, None).unwrap();
        write_legend(&mut out, &legend).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "0\t#0000bf");
        assert_eq!(lines[2], "2\t#bf0000");
        assert_eq!(lines[3], "# min 2.00\t#0000bf");
        assert_eq!(lines[4], "# max 10.00\t#bf0000");
    }

    #[test]
    fn samples_keyed_by_name() {
        let names =
            read_sample_names("# names\nbrca 01\nluad\ncoad\n".as_bytes())
                .unwrap();
        assert_eq!(names, vec!["brca 01", "luad", "coad"]);

        let target = Target::numerical(vec![0.0, 0.5, 1.0]).unwrap();
        let (colors, _) =
            sample_colors(&target, &ColorOptions::default()).unwrap();

        let mut out: Vec<u8> = Vec::new();
        write_colors(&mut out, &colors, Some(names.as_slice())).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "brca 01\t#0000bf");
        assert_eq!(lines[2], "coad\t#bf0000");

        let mut out: Vec<u8> = Vec::new();
        assert!(write_colors(&mut out, &colors, Some(&names[..2])).is_err());
    }

    #[test]
    fn zero_minimum_left_out_of_the_legend() {
        let target = Target::numerical(vec![0.0, 0.0005, 4.0]).unwrap();
        let (_, legend) =
            sample_colors(&target, &ColorOptions::default()).unwrap();

        let mut out: Vec<u8> = Vec::new();
        write_legend(&mut out, &legend).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text, "# max 4.00\t#bf0000\n");
    }
}
