use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tower_lsp::{LspService, Server};
use tracing::{error, info};

use laravel_navigator::config::{ConfigOverrides, Project, RouteSource};
use laravel_navigator::logging::init_logger;
use laravel_navigator::lsp::{BackendOptions, NavigatorBackend};
use laravel_navigator::{Category, Navigator, RankingMode};

#[derive(Parser, Debug)]
#[command(name = "laravel-navigator", version, about = "Completion and navigation for Laravel project symbols")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Directory inside the project; defaults to the current directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log filter for stderr, e.g. "debug" or "laravel_navigator=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable ANSI colors in log output
    #[arg(long, global = true)]
    no_color: bool,

    /// Also write a debug session log to the user cache directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Where route names come from: static, artisan or auto
    #[arg(long, global = true)]
    route_source: Option<RouteSource>,

    /// Seconds to wait for `artisan route:list`
    #[arg(long, global = true)]
    artisan_timeout: Option<u64>,

    /// Completion ordering: index or relevance
    #[arg(long, global = true, default_value = "index")]
    ranking: RankingMode,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides { route_source: self.route_source, artisan_timeout_secs: self.artisan_timeout }
    }

    fn start_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to read the current directory"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the language server on stdio
    Serve,
    /// Complete the symbol under the cursor of one source line
    Complete {
        /// The source line
        line: String,
        /// Cursor byte offset; defaults to the end of the line
        #[arg(long)]
        cursor: Option<usize>,
    },
    /// Resolve a symbol name to its file and line
    Resolve {
        category: Category,
        name: String,
    },
    /// List the names of one category
    Symbols {
        category: Category,
    },
    /// Print the model relationship graph
    Relationships,
    /// List the files a view name may live in, in lookup order
    Candidates {
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = &cli.global;

    let _guard = init_logger(global.no_color, global.log_level.as_deref(), global.log_file)
        .context("Failed to initialize logging")?;

    match &cli.command {
        Command::Serve => serve(global),
        command => query(global, command),
    }
}

fn serve(global: &GlobalArgs) -> Result<()> {
    let options = BackendOptions { root: global.root.clone(), overrides: global.overrides(), ranking: global.ranking };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    runtime.block_on(async move {
        info!("Starting language server v{} on stdio", env!("CARGO_PKG_VERSION"));
        let (service, socket) = LspService::new(|client| NavigatorBackend::new(client, options));
        Server::new(tokio::io::stdin(), tokio::io::stdout(), socket).serve(service).await;
        info!("Language server stopped");
    });
    Ok(())
}

fn open_navigator(global: &GlobalArgs) -> Result<Navigator> {
    let start = global.start_dir()?;
    let project = Project::open_with(&start, &global.overrides())
        .with_context(|| format!("Failed to open a Laravel project from {}", start.display()))?;
    Ok(Navigator::new(project))
}

fn query(global: &GlobalArgs, command: &Command) -> Result<()> {
    let navigator = open_navigator(global)?;

    match command {
        Command::Serve => Err(anyhow!("serve is not a query")),
        Command::Complete { line, cursor } => {
            let cursor = cursor.unwrap_or(line.len());
            let completions = navigator.complete(line, cursor, global.ranking);
            report_failures(&navigator);
            print_json(&completions)
        }
        Command::Resolve { category, name } => {
            let target = navigator.resolve(*category, name);
            report_failures(&navigator);
            print_json(&target)
        }
        Command::Symbols { category } => {
            let index = navigator.symbols(*category);
            report_failures(&navigator);
            print_json(index.entries())
        }
        Command::Relationships => {
            let graph = navigator.relationships();
            report_failures(&navigator);
            print_json(&graph)
        }
        Command::Candidates { name } => {
            let root = navigator.project().root();
            let candidates: Vec<String> =
                navigator.view_candidates(name).iter().map(|path| relative_display(root, path)).collect();
            print_json(&candidates)
        }
    }
}

fn report_failures(navigator: &Navigator) {
    for category in Category::ALL {
        if let Some(e) = navigator.take_failure(category) {
            error!("{} extraction failed: {}", category, e);
        }
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write JSON output")?;
    writeln!(out).context("Failed to write JSON output")?;
    Ok(())
}
