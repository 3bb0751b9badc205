use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use topic_sync::config::{self, SiteConfig};
use topic_sync::content::ContentParser;
use topic_sync::dom::Document;
use topic_sync::markup::{self, ContentFile};
use topic_sync::output;
use topic_sync::system::{Action, Environment, GallerySystem, HeadlessOptions};
use topic_sync::types::Season;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "topic-sync")]
#[command(about = "Headless topic and season synchronization for gallery pages")]
#[command(long_about = "\
Headless topic and season synchronization for gallery pages

A page carries its topics as data attributes in a hidden container. Picking a
topic updates the topic list, the gallery carousel, the hero and quote images,
a transient banner and the ?topic= query parameter. A season switch re-derives
every image for the selected topic without selecting anything.

Pages can be given as HTML or as a content.toml, which is rendered into a
page first:

  [[topics]]
  name = \"Alps & Lakes\"
  gallery = \"Alpine Lakes\"       # Optional gallery tab label

  [topics.summer]
  images = [\"/img/alps-s1.jpg\"]
  hero = \"/img/alps-hero.jpg\"
  quote = \"/img/alps-quote.jpg\"

Actions for 'simulate':
  topic:<slug>      click a topic control
  tab:<slug>        click a gallery tab
  season            click the season switch
  season:<name>     set summer or winter
  swipe:next|prev   swipe the gallery carousel

Set RUST_LOG (e.g. RUST_LOG=topic_sync=debug) for diagnostics on stderr.
Run 'topic-sync gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site config file (missing file means stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the topics a page carries
    Inspect {
        /// Page HTML or content.toml
        page: PathBuf,
    },
    /// Mount a page headlessly, apply actions and print the resulting state
    Simulate(SimulateArgs),
    /// Print a page skeleton rendered from a content.toml
    Scaffold {
        content: PathBuf,
        /// Season the skeleton starts in (defaults to the config's)
        #[arg(long)]
        season: Option<Season>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct SimulateArgs {
    /// Page HTML or content.toml
    page: PathBuf,

    /// Page URL, including any ?topic= parameter
    #[arg(long, default_value = "https://localhost/")]
    url: Url,

    /// Action to apply, in order (repeatable)
    #[arg(long = "action", value_name = "ACTION")]
    actions: Vec<Action>,

    /// Image URL whose load fails (repeatable)
    #[arg(long = "fail-image", value_name = "URL")]
    fail_images: Vec<String>,

    /// Viewport width used to resolve carousel breakpoints
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Print the snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Print the final page HTML after the snapshot
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("topic_sync=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { page } => {
            let site = config::load_config(&cli.config)?;
            let doc = Rc::new(RefCell::new(load_page(&page, &site)?));
            let topics = ContentParser::new(doc, &site.selectors).parse();
            output::print_topics(&topics);
        }
        Command::Simulate(args) => {
            let site = config::load_config(&cli.config)?;
            simulate(args, &site)?;
        }
        Command::Scaffold { content, season } => {
            let site = config::load_config(&cli.config)?;
            let content = ContentFile::load(&content)?;
            println!(
                "{}",
                markup::page_html(&content, season.unwrap_or(site.default_season))
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn simulate(args: SimulateArgs, site: &SiteConfig) -> Result<(), Box<dyn std::error::Error>> {
    let doc = Rc::new(RefCell::new(load_page(&args.page, site)?));
    let options = HeadlessOptions {
        viewport_width: args.width,
        failing_images: args.fail_images,
    };
    let env = Environment::headless(&doc, &site.selectors, &options);
    let mut system = GallerySystem::mount(doc, args.url, env, site);
    system.run_until_idle();
    for action in &args.actions {
        system.apply(action);
    }
    info!(actions = args.actions.len(), "simulation settled");

    let snapshot = system.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        output::print_snapshot(&snapshot);
    }
    if args.dump {
        println!();
        println!("{}", system.document().to_html());
    }
    Ok(())
}

/// Read a page, rendering it first when given a content.toml.
fn load_page(path: &Path, site: &SiteConfig) -> Result<Document, Box<dyn std::error::Error>> {
    let html = if path.extension().is_some_and(|ext| ext == "toml") {
        markup::page_html(&ContentFile::load(path)?, site.default_season)
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(Document::parse_html(&html))
}
