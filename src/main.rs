mod cli;

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use html_templates::{ArgumentExpander, Arguments, ExpansionService, ParameterReplacer, ReplacerConfig};

use crate::cli::Cli;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn parse_bindings(bindings: &[String]) -> Arguments {
    let mut args = Arguments::new();
    for binding in bindings {
        match binding.split_once('=') {
            Some((name, value)) if !name.is_empty() => args.insert(name.trim(), value),
            _ => args.push_positional(binding.as_str()),
        }
    }
    args
}

fn read_fragment(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read fragment from stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ReplacerConfig::load(path)?,
        None => ReplacerConfig::default(),
    };
    let fragment = read_fragment(&cli.fragment)?;
    let expander = ArgumentExpander::new(parse_bindings(&cli.args));
    log::debug!("rendering with {} arguments", expander.arguments().len());

    let rendered = ParameterReplacer::new(config).render(&fragment, &expander);
    let html = expander.unstrip(&rendered.html);

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(html.as_bytes())?;
    stdout.flush()?;
    for module in &rendered.dependencies.scripts {
        eprintln!("script module: {module}");
    }
    for module in &rendered.dependencies.styles {
        eprintln!("style module: {module}");
    }
    Ok(())
}
