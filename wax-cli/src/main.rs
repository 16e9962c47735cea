//! Wax CLI - Command line interface
//!
//! Project-based rendering - configuration from wax.json

use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

mod config;
mod logging;
mod platform;

use crate::config::ProjectFile;
use crate::logging::LogFormat;
use crate::platform::{print_error, ReportFormat};
use wax_api::{init_config, Engine, FsViewResolver, HostValue, RunConfig, WaxError};
use wax_vfs::NativeFileSystem;

#[derive(Parser)]
#[command(
    name = "wax",
    about = "Wax view engine - render a JSX/TSX view to HTML",
    version = "0.1.0"
)]
struct Cli {
    /// Project file path
    #[arg(long, value_name = "CONFIG", default_value = "wax.json")]
    config: PathBuf,

    /// View to render (overrides the project file)
    #[arg(long)]
    view: Option<String>,

    /// JSON file with the model (overrides the project file)
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Log and error report format
    #[arg(long, value_enum, default_value = "pretty")]
    format: LogFormat,

    /// Write HTML to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let project = match ProjectFile::read(&cli.config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let log_config = project.log_config();
    logging::init(&log_config, cli.format);

    let view = match cli.view.clone().or_else(|| project.view.clone()) {
        Some(view) => view,
        None => {
            eprintln!(
                "Error: no view to render; pass --view or set 'view' in '{}'",
                cli.config.display()
            );
            process::exit(1);
        }
    };

    let model = match read_model(cli.model.as_deref(), &project) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let root = project.root_dir(&cli.config);
    let (logger, recent) = logging::engine_logger(&log_config);
    let run_config = RunConfig {
        engine: project.engine_config(),
        logger,
    };
    // 全局单例供嵌入方读取；重复初始化时沿用已有配置
    let _ = init_config(run_config.clone());

    tracing::info!(target: "wax::cli", "rendering '{}' from {}", view, root.display());

    let resolver = Arc::new(
        FsViewResolver::new(Arc::new(NativeFileSystem::with_base(&root)))
            .with_extensions(run_config.engine.extensions.clone()),
    );
    let engine = Engine::from_run_config(resolver, &run_config);

    let report_format = match cli.format {
        LogFormat::Json => ReportFormat::Json,
        _ => ReportFormat::Text,
    };

    if let Err(e) = render(&engine, &view, &model, cli.output.as_deref()) {
        print_error(&e, report_format, &root);
        if report_format == ReportFormat::Text && !recent.is_empty() {
            eprintln!("\nrecent engine log:\n{}", recent.dump());
        }
        process::exit(1);
    }
}

/// Model from --model, else the project file, else null
fn read_model(path: Option<&Path>, project: &ProjectFile) -> Result<HostValue, String> {
    let Some(path) = path else {
        return Ok(project.model.clone().map(HostValue::from).unwrap_or_default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read model '{}': {}", path.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("invalid model '{}': {}", path.display(), e))?;
    Ok(HostValue::from(json))
}

fn render(
    engine: &Engine,
    view: &str,
    model: &HostValue,
    output: Option<&Path>,
) -> Result<(), WaxError> {
    match output {
        Some(path) => {
            let html = engine.render_to_string(view, model)?;
            std::fs::write(path, html)
                .map_err(|e| WaxError::other(format!("cannot write '{}': {}", path.display(), e)))
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            engine.render(&mut out, view, model)?;
            writeln!(out).map_err(|e| WaxError::other(format!("failed to write output: {}", e)))
        }
    }
}
