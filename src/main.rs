mod app;
mod config;
mod content;
mod visited;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use app::{KnowledgeGraphApp, LaunchOptions, RendererPreference};
use config::ViewerConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Content link index (JSON object of page identifier to title, links and tags).
    #[arg(long, default_value = "contentIndex.json")]
    index: PathBuf,
    /// Page to open first, as an identifier or a site path.
    #[arg(long)]
    page: Option<String>,
    /// Viewer configuration file with `basePath`, `local` and `global` sections.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Site path prefix used for navigation locations; overrides the config file.
    #[arg(long)]
    base_path: Option<String>,
    /// Where the visited-page set is kept.
    #[arg(long)]
    visited_store: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = RendererPreference::Auto)]
    renderer: RendererPreference,
    /// Tracing filter directive, e.g. `linkweb=debug`.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();

    let mut config = ViewerConfig::load(args.config.as_deref());
    if let Some(base_path) = args.base_path {
        config.base_path = base_path;
    }
    info!(index = %args.index.display(), base_path = %config.base_path, "starting viewer");

    let options = LaunchOptions {
        index_path: args.index,
        start_page: args.page,
        visited_store: args.visited_store,
        renderer: args.renderer,
        config,
    };
    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 840.0]),
        ..Default::default()
    };

    eframe::run_native(
        "linkweb",
        native_options,
        Box::new(move |cc| Ok(Box::new(KnowledgeGraphApp::new(cc, options)))),
    )
}
