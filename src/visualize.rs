//! SVG plots of a finished run: fitness per generation and species sizes.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::neat::StatisticsReporter;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

const SPECIES_COLORS: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Error, Debug)]
pub enum VisualizeError {
    #[error("no generations recorded")]
    NoData,

    #[error("failed to write plot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Maps data coordinates onto the drawing area.
struct Frame {
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn new(generations: usize, y_min: f64, y_max: f64) -> Self {
        let (y_min, y_max) = if y_max > y_min {
            (y_min, y_max)
        } else {
            (y_min - 1.0, y_max + 1.0)
        };
        Self {
            x_max: generations.saturating_sub(1).max(1) as f64,
            y_min,
            y_max,
        }
    }

    fn x(&self, generation: usize) -> f64 {
        MARGIN_LEFT + generation as f64 / self.x_max * (WIDTH - MARGIN_LEFT - MARGIN_RIGHT)
    }

    fn y(&self, value: f64) -> f64 {
        let span = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        HEIGHT - MARGIN_BOTTOM - (value - self.y_min) / (self.y_max - self.y_min) * span
    }
}

/// Symmetric log: linear sign, logarithmic magnitude, defined at zero.
fn symlog(value: f64) -> f64 {
    value.signum() * value.abs().ln_1p()
}

fn open_svg(title: &str, x_label: &str, y_label: &str) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">
<rect width="100%" height="100%" fill="white"/>
<text x="{}" y="24" text-anchor="middle" font-size="16">{title}</text>
<text x="{}" y="{}" text-anchor="middle">{x_label}</text>
<text x="18" y="{}" text-anchor="middle" transform="rotate(-90 18 {})">{y_label}</text>
"#,
        WIDTH / 2.0,
        (MARGIN_LEFT + WIDTH - MARGIN_RIGHT) / 2.0,
        HEIGHT - 12.0,
        HEIGHT / 2.0,
        HEIGHT / 2.0,
    );
    svg
}

fn draw_axes(svg: &mut String, frame: &Frame, generations: usize, y_tick: impl Fn(f64) -> String) {
    let left = MARGIN_LEFT;
    let bottom = HEIGHT - MARGIN_BOTTOM;
    let _ = writeln!(
        svg,
        r#"<line x1="{left}" y1="{bottom}" x2="{}" y2="{bottom}" stroke="black"/>"#,
        WIDTH - MARGIN_RIGHT
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{left}" y1="{MARGIN_TOP}" x2="{left}" y2="{bottom}" stroke="black"/>"#
    );

    for i in 0..=4 {
        let value = frame.y_min + (frame.y_max - frame.y_min) * f64::from(i) / 4.0;
        let y = frame.y(value);
        let _ = writeln!(
            svg,
            r##"<line x1="{left}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="#dddddd"/><text x="{}" y="{:.1}" text-anchor="end">{}</text>"##,
            WIDTH - MARGIN_RIGHT,
            left - 6.0,
            y + 4.0,
            y_tick(value)
        );
    }

    let step = (generations / 5).max(1);
    for generation in (0..generations).step_by(step) {
        let x = frame.x(generation);
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{}" text-anchor="middle">{generation}</text>"#,
            bottom + 16.0
        );
    }
}

fn polyline(svg: &mut String, frame: &Frame, values: &[f64], color: &str, dashed: bool) {
    let points: Vec<String> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(g, v)| format!("{:.1},{:.1}", frame.x(g), frame.y(*v)))
        .collect();
    let dash = if dashed { r#" stroke-dasharray="4 3""# } else { "" };
    let _ = writeln!(
        svg,
        r#"<polyline fill="none" stroke="{color}" stroke-width="1.5"{dash} points="{}"/>"#,
        points.join(" ")
    );
}

fn legend(svg: &mut String, entries: &[(&str, &str)]) {
    for (i, (label, color)) in entries.iter().enumerate() {
        let y = MARGIN_TOP + 14.0 + i as f64 * 16.0;
        let x = WIDTH - MARGIN_RIGHT - 150.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{x}" y1="{y}" x2="{}" y2="{y}" stroke="{color}" stroke-width="2"/><text x="{}" y="{}">{label}</text>"#,
            x + 20.0,
            x + 26.0,
            y + 4.0
        );
    }
}

fn write_svg(path: &Path, svg: String) -> Result<(), VisualizeError> {
    std::fs::write(path, svg).map_err(|source| VisualizeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Average, average ± one standard deviation, and best fitness per
/// generation. `ylog` switches the y axis to a symmetric log scale.
pub fn plot_stats(
    stats: &StatisticsReporter,
    path: impl AsRef<Path>,
    ylog: bool,
) -> Result<(), VisualizeError> {
    let generations = stats.generations();
    if generations == 0 {
        return Err(VisualizeError::NoData);
    }

    let avg = stats.fitness_mean();
    let std = stats.fitness_stdev();
    let best = stats.best_fitness();
    let minus: Vec<f64> = avg.iter().zip(&std).map(|(a, s)| a - s).collect();
    let plus: Vec<f64> = avg.iter().zip(&std).map(|(a, s)| a + s).collect();

    let scale = |values: &[f64]| -> Vec<f64> {
        if ylog {
            values.iter().map(|v| symlog(*v)).collect()
        } else {
            values.to_vec()
        }
    };
    let series = [scale(&avg), scale(&minus), scale(&plus), scale(&best)];

    let finite = series.iter().flatten().copied().filter(|v| v.is_finite());
    let (y_min, y_max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (y_min, y_max) = if y_min.is_finite() { (y_min, y_max) } else { (0.0, 1.0) };
    let frame = Frame::new(generations, y_min, y_max);

    let y_label = if ylog { "Fitness (symlog)" } else { "Fitness" };
    let mut svg = open_svg("Population's average and best fitness", "Generations", y_label);
    draw_axes(&mut svg, &frame, generations, |v| {
        let v = if ylog { v.signum() * v.abs().exp_m1() } else { v };
        format!("{v:.1}")
    });
    polyline(&mut svg, &frame, &series[0], "#1f77b4", false);
    polyline(&mut svg, &frame, &series[1], "#2ca02c", true);
    polyline(&mut svg, &frame, &series[2], "#2ca02c", true);
    polyline(&mut svg, &frame, &series[3], "#d62728", false);
    legend(
        &mut svg,
        &[
            ("average", "#1f77b4"),
            ("-1 sd", "#2ca02c"),
            ("+1 sd", "#2ca02c"),
            ("best", "#d62728"),
        ],
    );
    svg.push_str("</svg>\n");

    write_svg(path.as_ref(), svg)
}

/// Stacked area of every species' size over the generations.
pub fn plot_species(stats: &StatisticsReporter, path: impl AsRef<Path>) -> Result<(), VisualizeError> {
    let sizes = stats.species_sizes();
    let generations = sizes.len();
    if generations == 0 {
        return Err(VisualizeError::NoData);
    }
    let num_species = sizes.iter().map(Vec::len).max().unwrap_or(0);

    // cumulative[s][g]: top edge of species s in generation g
    let mut cumulative = vec![vec![0.0; generations]; num_species];
    for (g, row) in sizes.iter().enumerate() {
        let mut running = 0.0;
        for s in 0..num_species {
            running += row.get(s).copied().unwrap_or(0) as f64;
            cumulative[s][g] = running;
        }
    }
    let total_max = cumulative
        .last()
        .map_or(0.0, |top| top.iter().copied().fold(0.0, f64::max));
    let frame = Frame::new(generations, 0.0, total_max.max(1.0));

    let mut svg = open_svg("Speciation", "Generations", "Size per Species");
    draw_axes(&mut svg, &frame, generations, |v| format!("{v:.0}"));

    let zero = vec![0.0; generations];
    for s in 0..num_species {
        let lower = if s == 0 { &zero } else { &cumulative[s - 1] };
        let upper = &cumulative[s];
        let mut points: Vec<String> = (0..generations)
            .map(|g| format!("{:.1},{:.1}", frame.x(g), frame.y(upper[g])))
            .collect();
        points.extend(
            (0..generations)
                .rev()
                .map(|g| format!("{:.1},{:.1}", frame.x(g), frame.y(lower[g]))),
        );
        let color = SPECIES_COLORS[s % SPECIES_COLORS.len()];
        let _ = writeln!(
            svg,
            r#"<polygon fill="{color}" fill-opacity="0.8" stroke="none" points="{}"/>"#,
            points.join(" ")
        );
    }
    svg.push_str("</svg>\n");

    write_svg(path.as_ref(), svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::config::tests::pole_config;
    use crate::neat::{DefaultGenome, Genomes, Reporter, Species, SpeciesSet};

    fn record(stats: &mut StatisticsReporter, members: &[(u64, f64, u64)]) {
        let mut population = Genomes::new();
        let mut species = SpeciesSet::new();
        for &(key, fitness, sid) in members {
            let mut genome = DefaultGenome::new(key);
            genome.fitness = Some(fitness);
            species
                .species
                .entry(sid)
                .or_insert_with(|| Species::new(sid, 0, genome.clone()))
                .members
                .push(key);
            population.insert(key, genome);
        }
        let best = population
            .values()
            .max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap())
            .cloned()
            .unwrap();
        stats.post_evaluate(&pole_config(), &population, &species, &best);
    }

    fn sample_stats() -> StatisticsReporter {
        let mut stats = StatisticsReporter::new();
        record(&mut stats, &[(1, 10.0, 1), (2, 20.0, 1), (3, 5.0, 2)]);
        record(&mut stats, &[(4, 30.0, 1), (5, -2.0, 2), (6, 40.0, 3)]);
        stats
    }

    fn temp_svg(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{name}-{}.svg", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_plot_stats_draws_four_series() {
        let path = temp_svg("avg_fitness");
        plot_stats(&sample_stats(), &path, false).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 4);
        assert!(svg.contains("Population's average and best fitness"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_plot_stats_symlog_axis() {
        let path = temp_svg("avg_fitness_log");
        plot_stats(&sample_stats(), &path, true).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Fitness (symlog)"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_plot_species_one_band_per_species() {
        let path = temp_svg("speciation");
        plot_species(&sample_stats(), &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert_eq!(svg.matches("<polygon").count(), 3);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_empty_statistics_are_rejected() {
        let stats = StatisticsReporter::new();
        assert!(matches!(
            plot_stats(&stats, temp_svg("empty"), false),
            Err(VisualizeError::NoData)
        ));
        assert!(matches!(
            plot_species(&stats, temp_svg("empty")),
            Err(VisualizeError::NoData)
        ));
    }

    #[test]
    fn test_symlog_is_odd_and_zero_at_zero() {
        assert_eq!(symlog(0.0), 0.0);
        assert!((symlog(-10.0) + symlog(10.0)).abs() < 1e-12);
        assert!(symlog(100.0) < 100.0);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let path = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("avg_fitness.svg");
        assert!(matches!(
            plot_stats(&sample_stats(), &path, false),
            Err(VisualizeError::Io { .. })
        ));
    }
}
