//! docx-storymap CLI - publish Word documents and HTML pages as ArcGIS StoryMaps

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use docx_storymap::publish::story_url;
use docx_storymap::render::to_json;
use docx_storymap::{
    detect_format_from_path, parse_file_with_options, source_format_from_path, ContentApi,
    Converter, Document, JsonFormat, MemoryPortal, ParseOptions, PortalClient, ProfileParams,
    PublishOutcome, Publisher, Resource, SourceFormat, StoryOptions, Warning,
};

#[derive(Parser)]
#[command(name = "docx-storymap")]
#[command(version)]
#[command(about = "Publish Word documents and HTML pages as ArcGIS StoryMaps", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a DOCX or HTML file as a new story
    Publish {
        /// Input DOCX or HTML file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        story: StoryArgs,

        /// JSON connection profile; its values override the flags below
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Portal URL
        #[arg(long)]
        url: Option<String>,

        /// Account name
        #[arg(long)]
        username: Option<String>,

        /// Account password
        #[arg(long, env = "STORYMAP_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Run the publish protocol against an in-memory portal
        #[arg(long)]
        dry_run: bool,

        /// Also write the final story JSON to a file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Convert a DOCX or HTML file to story JSON without publishing
    Convert {
        /// Input DOCX or HTML file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        story: StoryArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit the placeholder draft and its token table instead
        #[arg(long)]
        placeholders: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show document information
    Info {
        /// Input DOCX or HTML file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct StoryArgs {
    /// Story title (defaults to the document title, then the file name)
    #[arg(short, long)]
    title: Option<String>,

    /// Comma-separated item tags
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Cover subtitle and item snippet
    #[arg(long)]
    summary: Option<String>,

    /// Item description
    #[arg(long)]
    description: Option<String>,

    /// Cover image file
    #[arg(long, value_name = "IMAGE")]
    cover: Option<PathBuf>,
}

impl StoryArgs {
    fn resolve(
        self,
        doc: &Document,
        input: &Path,
    ) -> Result<StoryOptions, Box<dyn std::error::Error>> {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let mut story = StoryOptions::from_metadata(&doc.metadata, &stem);

        if let Some(title) = self.title {
            story.title = title;
        }
        if !self.tags.is_empty() {
            story = story.with_tags(
                self.tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            );
        }
        if let Some(summary) = self.summary {
            story = story.with_summary(summary);
        }
        if let Some(description) = self.description {
            story = story.with_description(description);
        }
        if let Some(path) = self.cover {
            let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
            let resource = Resource::from_bytes(fs::read(&path)?).with_filename(name);
            if !resource.is_image() {
                return Err(format!("{} is not a supported image", path.display()).into());
            }
            story = story.with_cover_image(resource);
        }
        Ok(story)
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Publish {
            input,
            story,
            config,
            url,
            username,
            password,
            dry_run,
            output,
        } => {
            let params = ProfileParams {
                url,
                username,
                password,
                ..Default::default()
            };
            cmd_publish(
                &input,
                story,
                params,
                config.as_deref(),
                dry_run,
                output.as_deref(),
                cli.verbose,
            )
        }
        Commands::Convert {
            input,
            story,
            output,
            placeholders,
            compact,
        } => {
            init_logging(verbosity(cli.verbose));
            cmd_convert(&input, story, output.as_deref(), placeholders, compact)
        }
        Commands::Info { input } => {
            init_logging(verbosity(cli.verbose));
            cmd_info(&input)
        }
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn verbosity(count: u8) -> LevelFilter {
    match count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// `RUST_LOG` wins over the computed level.
fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn spinner(message: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

fn cmd_publish(
    input: &Path,
    story: StoryArgs,
    params: ProfileParams,
    config: Option<&Path>,
    dry_run: bool,
    output: Option<&Path>,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = if dry_run {
        None
    } else {
        Some(params.resolve(config)?)
    };
    let level = profile
        .as_ref()
        .map_or(LevelFilter::Info, |p| p.debug.level_filter())
        .max(verbosity(verbose));
    init_logging(level);

    let doc = parse_file_with_options(input, ParseOptions::new().lenient())?;
    let story = story.resolve(&doc, input)?;

    let outcome = match &profile {
        Some(profile) => {
            let client = PortalClient::new(profile)?;
            let outcome = run_publish(client, &doc, &story)?;
            print_outcome(&outcome);
            let view = story_url(&profile.url, &outcome.item_id);
            println!("  {} {}", "View:".bold(), view);
            println!("  {} {}/edit", "Edit:".bold(), view);
            if let Some(path) = profile.write_debug_dump(&story.title, &outcome.tree)? {
                println!("  {} {}", "Debug dump:".bold(), path.display());
            }
            outcome
        }
        None => {
            let outcome = run_publish(MemoryPortal::lossy(), &doc, &story)?;
            println!("{}", "Dry run: nothing was sent to a portal".yellow());
            print_outcome(&outcome);
            outcome
        }
    };

    if let Some(path) = output {
        fs::write(path, to_json(&outcome.tree, JsonFormat::Pretty)?)?;
        println!("{} {}", "Saved to".green(), path.display());
    }

    print_warnings(&outcome.warnings);
    Ok(())
}

fn run_publish<A: ContentApi>(
    api: A,
    doc: &Document,
    story: &StoryOptions,
) -> Result<PublishOutcome, Box<dyn std::error::Error>> {
    let pb = spinner("Converting document...")?;
    let mut publisher = Publisher::new(api);

    let draft = match publisher.prepare(doc, story) {
        Ok(draft) => draft,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };
    pb.set_message(format!(
        "Publishing {} blocks with {} placeholders...",
        draft.stats.block_count(),
        draft.tokens.len()
    ));

    let result = publisher.publish_draft(draft);
    pb.finish_and_clear();
    Ok(result?)
}

fn print_outcome(outcome: &PublishOutcome) {
    let stats = &outcome.stats;
    println!("{} item {}", "Published".green().bold(), outcome.item_id);
    println!(
        "  {} blocks, {} lists, {} images, {} placeholders substituted",
        stats.block_count(),
        stats.list_count,
        stats.image_count,
        outcome.replaced
    );
}

fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("{} ({})", "Warnings".yellow().bold(), warnings.len());
    for warning in warnings {
        println!("  {} {}", "-".dimmed(), warning);
    }
}

fn cmd_convert(
    input: &Path,
    story: StoryArgs,
    output: Option<&Path>,
    placeholders: bool,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = parse_file_with_options(input, ParseOptions::new().lenient())?;
    let story = story.resolve(&doc, input)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let mut publisher = Publisher::new(MemoryPortal::new());
    let (json, warnings) = if placeholders {
        let draft = publisher.prepare(&doc, &story)?;
        (to_json(&draft, format)?, draft.warnings)
    } else {
        let outcome = publisher.publish(&doc, &story)?;
        (to_json(&outcome.tree, format)?, outcome.warnings)
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
        print_warnings(&warnings);
    } else {
        println!("{}", json);
        for warning in &warnings {
            eprintln!("{}: {}", "Warning".yellow(), warning);
        }
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let format = match source_format_from_path(input)? {
        SourceFormat::Docx => detect_format_from_path(input)?.to_string(),
        SourceFormat::Html => SourceFormat::Html.to_string(),
    };
    let doc = parse_file_with_options(input, ParseOptions::new().lenient())?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);

    let metadata = &doc.metadata;
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref subject) = metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    let tags = metadata.tags();
    if !tags.is_empty() {
        println!("{}: {}", "Keywords".bold(), tags.join(", "));
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let text = doc.plain_text();
    let images = doc.resources.values().filter(|r| r.is_image()).count();

    println!("{}: {}", "Paragraphs".bold(), doc.paragraph_count());
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), text.chars().count());
    println!("{}: {}", "Image anchors".bold(), doc.anchor_count());
    println!("{}: {}", "Embedded images".bold(), images);
    if !doc.unresolved.is_empty() {
        println!(
            "{}: {}",
            "Unresolved images".bold(),
            doc.unresolved.len().to_string().yellow()
        );
    }

    let conversion = Converter::default().convert(&doc, &mut MemoryPortal::new())?;
    let stats = &conversion.stats;

    println!();
    println!("{}", "Story Blocks".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Blocks".bold(), stats.block_count());
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "Quotes".bold(), stats.quote_count);
    println!("{}: {}", "Code blocks".bold(), stats.code_block_count);
    println!(
        "{}: {} ({} items, {} coerced, {} flattened)",
        "Lists".bold(),
        stats.list_count,
        stats.list_item_count,
        stats.coerced_item_count,
        stats.flattened_item_count
    );
    println!(
        "{}: {} ({} captioned, {} skipped)",
        "Images".bold(),
        stats.image_count,
        stats.caption_count,
        stats.skipped_image_count
    );
    println!("{}: {}", "Separators".bold(), stats.separator_count);
    println!("{}: {}", "Tables dropped".bold(), stats.table_count);
    println!("{}: {}", "Placeholders".bold(), stats.placeholder_count);

    print_warnings(&conversion.warnings);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docx-storymap".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Word to ArcGIS StoryMap publisher");
    println!();
    println!("License: MIT");
}
