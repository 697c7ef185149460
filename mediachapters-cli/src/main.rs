//! mediachapters CLI - print the chapters of a media file.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use mediachapters::{
    extract, format_timestamp, to_webvtt, verify_filetype, Chapter, Extraction, MediaType,
    ParseConfig, DEFAULT_MAX_DEPTH, DEFAULT_REQUIRED_BRAND,
};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Default prefix length, the size of a typical range request.
const DEFAULT_PREFIX_BYTES: u64 = 4 * 1024 * 1024;

/// Output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// `{ media_type, duration, chapters, quirks }`
    Json,
    /// WebVTT chapters track, quirks as NOTE blocks
    Vtt,
    /// One `HH:MM:SS.mmm title` line per chapter
    Text,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "mediachapters")]
#[command(version)]
#[command(about = "Print the chapters of a Matroska/WebM or MP4 file")]
#[command(long_about = "Reads the start of a media file and prints its chapter markers.\n\n\
    Only the first --bytes bytes are read, so a partial download works as \n\
    long as it holds the container headers.\n\n\
    EXAMPLES:\n    \
    mediachapters movie.mkv\n    \
    mediachapters audiobook.m4b --format vtt\n    \
    mediachapters audiobook.m4b --require-brand=M4B\n    \
    mediachapters download.part --mime video/webm --format json")]
struct Args {
    /// Media file
    file: PathBuf,

    /// Read at most this many leading bytes
    #[arg(long, default_value_t = DEFAULT_PREFIX_BYTES)]
    bytes: u64,

    /// MIME type of the file (default: guessed from the extension)
    #[arg(long)]
    mime: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Preferred title language
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Require a compatible brand in an MP4 file's ftyp box (`--require-brand=BRAND`)
    #[arg(
        long,
        value_name = "BRAND",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = DEFAULT_REQUIRED_BRAND
    )]
    require_brand: Option<String>,

    /// Maximum nesting depth of Matroska elements
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Pick the media type from `--mime`, else from the file extension.
    fn media_type(&self) -> anyhow::Result<MediaType> {
        if let Some(mime) = &self.mime {
            return MediaType::from_mime(mime)
                .with_context(|| format!("Unsupported MIME type: {mime}"));
        }

        let ext = self
            .file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match MediaType::from_extension(ext) {
            Some(media_type) => Ok(media_type),
            None => bail!(
                "Cannot tell the container type of {}; pass --mime",
                self.file.display()
            ),
        }
    }
}

/// JSON output structure.
#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    media_type: MediaType,
    duration: Option<f64>,
    chapters: &'a [Chapter],
    quirks: &'a [String],
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let media_type = args.media_type()?;
    let data = read_prefix(&args.file, args.bytes)?;
    debug!(file = %args.file.display(), bytes = data.len(), %media_type, "Read file prefix");

    if let (Some(brand), MediaType::IsoBmff) = (&args.require_brand, media_type) {
        verify_filetype(&data, brand)
            .with_context(|| format!("{} failed the brand check", args.file.display()))?;
    }

    let config = ParseConfig::default().with_max_depth(args.max_depth);
    let extraction = match extract(media_type, &data, config) {
        Ok(extraction) => extraction,
        Err(failure) => {
            if !failure.quirks.is_empty() {
                eprintln!("quirks: {}", failure.quirks.join(", "));
            }
            return Err(failure)
                .with_context(|| format!("Failed to read chapters of {}", args.file.display()));
        }
    };

    if extraction.info.is_none() && args.format == OutputFormat::Text {
        eprintln!("No chapters found");
    }
    print!("{}", render(&extraction, args.format, &args.lang)?);

    Ok(())
}

/// Read at most `limit` bytes from the start of `path`.
fn read_prefix(path: &Path, limit: u64) -> anyhow::Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("File not found: {}", path.display()))?;
    let mut data = Vec::new();
    file.take(limit)
        .read_to_end(&mut data)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(data)
}

/// Render an extraction in the requested format.
fn render(extraction: &Extraction, format: OutputFormat, lang: &str) -> anyhow::Result<String> {
    let chapters = extraction
        .info
        .as_ref()
        .map_or(&[][..], |info| info.chapters.as_slice());

    let output = match format {
        OutputFormat::Json => {
            let json = JsonOutput {
                media_type: extraction.media_type,
                duration: extraction.info.as_ref().map(|info| info.duration),
                chapters,
                quirks: &extraction.quirks,
            };
            format!("{}\n", serde_json::to_string_pretty(&json)?)
        }
        OutputFormat::Vtt => match &extraction.info {
            Some(info) => to_webvtt(&info.cues(lang), info.duration, &extraction.quirks),
            None => to_webvtt(&[], 0.0, &extraction.quirks),
        },
        OutputFormat::Text => chapters
            .iter()
            .map(|c| format!("{} {}\n", format_timestamp(c.start), c.title_in(lang)))
            .collect(),
    };

    Ok(output)
}
