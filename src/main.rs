use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};
use log::{info, warn};

use folio::debug::{DebugOptions, MIN_RULER_SPACING};
use folio::document::{self, RenderOptions};
use folio::fonts::CosmicTextMeasure;
use folio::output;
use folio::surface::PageSize;
use folio::{front_matter, Theme};

/// Render Markdown documents to paginated PDF, SVG or PNG
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Render Markdown to paginated PDF, SVG or PNG pages", long_about = None)]
struct Args {
    /// Input markdown file (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (extension determines format: .pdf, .svg or .png)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Built-in theme name or path to a TOML/YAML/JSON theme file
    #[arg(short, long, value_name = "THEME", env = "FOLIO_THEME")]
    theme: Option<String>,

    /// Page size
    #[arg(long, value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Skip the cover page even when the front matter has a title
    #[arg(long)]
    no_cover: bool,

    /// Do not number pages in the footer
    #[arg(long)]
    no_footer: bool,

    /// Text drawn centered in the top margin of every content page
    #[arg(long, value_name = "TEXT")]
    header: Option<String>,

    /// Tint the content box on every page
    #[arg(long)]
    debug_margins: bool,

    /// Draw a horizontal ruler every POINTS points
    #[arg(long, value_name = "POINTS", value_parser = parse_ruler)]
    ruler: Option<f32>,

    /// Raster scale multiplier for PNG output (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(size: PageSizeArg) -> Self {
        match size {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Pdf,
    Svg,
    Png,
}

fn output_format(path: &Path) -> Result<OutputFormat, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or("Output file has no extension")?
        .to_ascii_lowercase();

    match ext.as_str() {
        "pdf" => Ok(OutputFormat::Pdf),
        "svg" => Ok(OutputFormat::Svg),
        "png" => Ok(OutputFormat::Png),
        _ => Err(format!(
            "Unsupported output format: .{} (use .pdf, .svg or .png)",
            ext
        )),
    }
}

/// `out/report.svg` page 2 -> `out/report-2.svg`
fn parse_ruler(value: &str) -> Result<f32, String> {
    let spacing: f32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !spacing.is_finite() || spacing < MIN_RULER_SPACING {
        return Err(format!("ruler spacing must be at least {MIN_RULER_SPACING} points"));
    }
    Ok(spacing)
}

fn page_path(output: &Path, page: usize, ext: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    output.with_file_name(format!("{}-{}.{}", stem, page, ext))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn read_input(input: &Path) -> Result<String, String> {
    let bytes = if input.to_str() == Some("-") {
        let mut buffer = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        buffer
    } else {
        std::fs::read(input).map_err(|e| format!("Failed to read input file: {}", e))?
    };

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            warn!(
                "Input is not valid UTF-8 (first bad byte at {}), decoding lossily",
                err.utf8_error().valid_up_to()
            );
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    init_logging(args.verbose);

    let format = output_format(&args.output)?;

    let theme = match args.theme.as_deref() {
        Some(spec) => Theme::resolve(spec).map_err(|e| e.to_string())?,
        None => Theme::default(),
    };

    let source = read_input(&args.input)?;
    let (metadata, markdown) = front_matter::split(&source);
    if !metadata.is_empty() {
        info!("Front matter carried {} field(s)", metadata.len());
    }

    let options = RenderOptions {
        page_size: args.page_size.into(),
        cover: !args.no_cover,
        header: args.header.clone(),
        footer: !args.no_footer,
        debug: DebugOptions {
            show_margins: args.debug_margins,
            ruler_spacing: args.ruler,
            log_cursor: args.verbose >= 3,
            log_page_breaks: args.verbose >= 1,
        },
    };

    match format {
        OutputFormat::Pdf => {
            let pdf = document::render_pdf(markdown, &metadata, &theme, &options)
                .map_err(|e| e.to_string())?;
            std::fs::write(&args.output, pdf).map_err(|e| format!("Failed to write PDF: {}", e))?;
            eprintln!("PDF saved to: {}", args.output.display());
        }
        OutputFormat::Svg | OutputFormat::Png => {
            let pages = document::render_svg_pages(
                markdown,
                &metadata,
                &theme,
                &options,
                CosmicTextMeasure::new(),
            )
            .map_err(|e| e.to_string())?;

            for (index, svg) in pages.iter().enumerate() {
                let number = index + 1;
                if format == OutputFormat::Svg {
                    let path = page_path(&args.output, number, "svg");
                    std::fs::write(&path, svg)
                        .map_err(|e| format!("Failed to write SVG: {}", e))?;
                    eprintln!("SVG saved to: {}", path.display());
                } else {
                    let png = output::svg_to_png(svg, args.png_scale).map_err(|e| e.to_string())?;
                    let path = page_path(&args.output, number, "png");
                    std::fs::write(&path, png)
                        .map_err(|e| format!("Failed to write PNG: {}", e))?;
                    eprintln!("PNG saved to: {}", path.display());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(output_format(Path::new("a.PDF")), Ok(OutputFormat::Pdf));
        assert_eq!(output_format(Path::new("a.svg")), Ok(OutputFormat::Svg));
        assert!(output_format(Path::new("a.docx")).is_err());
        assert!(output_format(Path::new("a")).is_err());
    }

    #[test]
    fn numbered_page_paths() {
        assert_eq!(
            page_path(Path::new("out/report.svg"), 2, "svg"),
            PathBuf::from("out/report-2.svg")
        );
    }

    #[test]
    fn ruler_spacing_has_a_floor() {
        assert_eq!(parse_ruler("36"), Ok(36.0));
        assert_eq!(parse_ruler("1"), Ok(1.0));
        assert!(parse_ruler("0.000001").is_err());
        assert!(parse_ruler("inf").is_err());
        assert!(parse_ruler("ten").is_err());
    }
}
