use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use argh::FromArgs;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use netcolor::arrows::{project_arrows, ArrowOptions};
use netcolor::color::{
    edge_colors, node_colors, sample_colors, ColorOptions, NanColor,
};
use netcolor::graph::Graph;
use netcolor::hue::{ColorScheme, HexColor};
use netcolor::io;
use netcolor::target::{Granularity, Target};

#[derive(FromArgs)]
/// Color Mapper graph nodes and samples by a target variable, and
/// project enriched features onto the layout
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Colors(ColorsArgs),
    Arrows(ArrowsArgs),
}

#[derive(FromArgs)]
/// Assign a hex color to every node (or sample)
#[argh(subcommand, name = "colors")]
struct ColorsArgs {
    /// graph nodes file: `node x y sample,sample,...` per line
    #[argh(option)]
    nodes: PathBuf,

    /// graph edges file: `node node` per line; prints edge colors
    #[argh(option)]
    edges: Option<PathBuf>,

    /// target values, one per sample, or `node value` per node
    #[argh(option)]
    target: PathBuf,

    /// target type, "numerical" or "categorical"
    #[argh(option, default = "String::from(\"numerical\")")]
    kind: String,

    /// target granularity, "sample" or "node"
    #[argh(option, default = "String::from(\"sample\")")]
    by: String,

    /// color the samples instead of the nodes
    #[argh(switch)]
    samples: bool,

    /// sample names, one per line, used to label sample colors
    #[argh(option)]
    sample_names: Option<PathBuf>,

    /// color scheme: hue (default), viridis, plasma, turbo, ...
    #[argh(
        option,
        default = "ColorScheme::HueSweep",
        from_str_fn(parse_scheme)
    )]
    scheme: ColorScheme,

    /// file of `label #rrggbb` lines overriding categorical colors
    #[argh(option)]
    palette: Option<PathBuf>,

    /// color for labels missing from the palette
    #[argh(option, from_str_fn(parse_color))]
    fallback: Option<HexColor>,

    /// color for entities without a value, instead of the lowest color
    #[argh(option, from_str_fn(parse_color))]
    nan_color: Option<HexColor>,
}

#[derive(FromArgs)]
/// Compute per-feature arrows from a node significance table
#[argh(subcommand, name = "arrows")]
struct ArrowsArgs {
    /// graph nodes file: `node x y sample,sample,...` per line
    #[argh(option)]
    nodes: PathBuf,

    /// significance table with a `node feature...` header
    #[argh(option)]
    scores: PathBuf,

    /// projected sample coordinates; node positions become the mean of
    /// their samples instead of the layout positions
    #[argh(option)]
    projection: Option<PathBuf>,

    /// length of the longest arrow
    #[argh(option, default = "1.0")]
    max_length: f64,

    /// p-value below which scores are considered significant
    #[argh(option, default = "0.05")]
    pvalue: f64,
}

fn parse_scheme(s: &str) -> std::result::Result<ColorScheme, String> {
    s.parse().map_err(|e: netcolor::error::ColorError| e.to_string())
}

fn parse_color(s: &str) -> std::result::Result<HexColor, String> {
    s.parse().map_err(|e: netcolor::error::ColorError| e.to_string())
}

fn load_graph(nodes: &Path, edges: Option<&Path>) -> Result<Graph> {
    let nodes_file = io::open(nodes)
        .with_context(|| format!("opening nodes file {}", nodes.display()))?;

    let edges_file = match edges {
        Some(path) => Some(
            io::open(path).with_context(|| {
                format!("opening edges file {}", path.display())
            })?,
        ),
        None => None,
    };

    Ok(io::read_graph(nodes_file, edges_file)?)
}

fn run_colors(args: ColorsArgs) -> Result<()> {
    let mut graph = load_graph(&args.nodes, args.edges.as_deref())?;

    if let Some(path) = &args.sample_names {
        let file = io::open(path).with_context(|| {
            format!("opening sample names {}", path.display())
        })?;
        graph = graph.with_sample_names(io::read_sample_names(file)?)?;
    }

    let granularity: Granularity = args.by.parse()?;
    let target_file = io::open(&args.target).with_context(|| {
        format!("opening target file {}", args.target.display())
    })?;
    let raw = io::read_target(target_file, granularity)?;
    let target = Target::from_strs(raw, &args.kind, &args.by)?;

    info!(
        "loaded {} target values ({:?}, {:?})",
        target.len(),
        target.kind(),
        target.granularity()
    );

    let palette = match &args.palette {
        Some(path) => {
            let palette = io::read_palette(io::open(path)?)?;
            Some(match args.fallback {
                Some(fallback) => palette.with_fallback(fallback),
                None => palette,
            })
        }
        None => None,
    };

    let options = ColorOptions {
        scheme: args.scheme,
        palette,
        nan_color: args
            .nan_color
            .map(NanColor::Fixed)
            .unwrap_or(NanColor::MinimumBand),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.samples {
        let (colors, legend) = sample_colors(&target, &options)?;
        io::write_colors(&mut out, &colors, graph.sample_names())?;
        io::write_legend(&mut out, &legend)?;
    } else {
        let (colors, legend) = node_colors(&target, &graph, &options)?;
        io::write_colors(&mut out, &colors, None)?;

        if args.edges.is_some() {
            let edges = edge_colors(&graph, &colors)?;
            io::write_edge_colors(&mut out, &edges)?;
        }

        io::write_legend(&mut out, &legend)?;
    }

    out.flush()?;

    Ok(())
}

fn run_arrows(args: ArrowsArgs) -> Result<()> {
    let graph = load_graph(&args.nodes, None)?;

    let table_file = io::open(&args.scores).with_context(|| {
        format!("opening score table {}", args.scores.display())
    })?;
    let table = io::read_significance(table_file, &graph)?;

    let positions = match &args.projection {
        Some(path) => {
            let projected = io::read_projection(io::open(path)?)?;
            graph.node_centroids(&projected)?
        }
        None => graph.positions().to_vec(),
    };

    let options = ArrowOptions {
        max_length: args.max_length,
        pvalue: args.pvalue,
    };

    let arrows = project_arrows(&table, &positions, &options)?;

    info!(
        "{} feature arrows, score threshold {:.4}",
        arrows.arrows.len(),
        arrows.threshold
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    io::write_arrows(&mut out, &arrows)?;
    out.flush()?;

    Ok(())
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;

    match args.command {
        Command::Colors(args) => run_colors(args),
        Command::Arrows(args) => run_arrows(args),
    }
}
