use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "html-templates")]
#[command(about = "Expand {{{placeholders}}} in an HTML fragment", long_about = None)]
pub struct Cli {
    /// TOML replacer configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Argument binding: NAME=VALUE, or a bare VALUE for the next positional slot
    #[arg(long = "arg", value_name = "BINDING")]
    pub args: Vec<String>,

    /// Fragment file, or `-` to read standard input
    #[arg(value_name = "FRAGMENT", default_value = "-")]
    pub fragment: PathBuf,
}
