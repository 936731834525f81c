use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "webeval", about = "Remote evaluation client and image gallery", version)]
#[command(group(ArgGroup::new("mode").args(["eval", "resource_url", "fetch", "ls", "cat", "list", "gallery"]).multiple(false)))]
#[command(group(ArgGroup::new("color_switch").args(["color", "no_color"]).multiple(false)))]
pub struct Cli {
    /// Evaluate code remotely and print the value.
    #[arg(long, value_name = "CODE")]
    pub eval: Option<String>,

    /// Bind a variable for --eval as name=JSON (plain text if not JSON). Repeatable.
    #[arg(long = "var", value_name = "NAME=VALUE", action = clap::ArgAction::Append)]
    pub vars: Vec<String>,

    /// Wait for the remote side effects to finish before returning.
    #[arg(long)]
    pub sync: bool,

    /// Print the raw evaluation result (value, errored, error) instead of the value.
    #[arg(long)]
    pub raw: bool,

    /// Print the resource URL for a bytes-returning expression.
    #[arg(long = "resource-url", value_name = "EXPR")]
    pub resource_url: Option<String>,

    /// Download the bytes of an expression through the resource endpoint.
    #[arg(long, value_name = "EXPR", requires = "out")]
    pub fetch: Option<String>,

    /// List files in the service's working directory.
    #[arg(long)]
    pub ls: bool,

    /// Read a remote file (base64 transfer); writes to --out or prints a data URL.
    #[arg(long, value_name = "PATH")]
    pub cat: Option<String>,

    /// Resolve the configured path query and print the matching paths.
    #[arg(long)]
    pub list: bool,

    /// Open the interactive gallery.
    #[arg(short = 'g', long)]
    pub gallery: bool,

    /// Path query template, e.g. "/data/{x:05}/*.png".
    #[arg(long = "query", value_name = "TEMPLATE")]
    pub path_query: Option<String>,

    /// Path query variable as name=integer. Repeatable.
    #[arg(long = "path-var", value_name = "NAME=INT", action = clap::ArgAction::Append)]
    pub path_vars: Vec<String>,

    /// Output file for --fetch and --cat.
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Cosmetic filename segment of resource URLs.
    #[arg(long, value_name = "NAME")]
    pub filename: Option<String>,

    /// Content type for resource URLs (defaults to CONTENT_TYPE).
    #[arg(long = "content-type", value_name = "MIME")]
    pub content_type: Option<String>,

    /// Cache key embedded in resource URLs.
    #[arg(long = "cache-key", default_value_t = 0)]
    pub cache_key: u64,

    /// Service base URL (overrides WEBEVAL_BASE_URL).
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Gallery page size (overrides PAGE_SIZE).
    #[arg(long = "page-size")]
    pub page_size: Option<usize>,

    /// Selection file for gallery export/import (overrides SELECTION_PATH).
    #[arg(long = "selection-file", value_name = "FILE")]
    pub selection_file: Option<PathBuf>,

    /// Skip the bootstrap evaluation that defines remote helpers.
    #[arg(long = "no-bootstrap")]
    pub no_bootstrap: bool,

    /// Force colored output.
    #[arg(long)]
    pub color: bool,
    /// Disable colored output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_are_exclusive() {
        assert!(Cli::try_parse_from(["webeval", "--eval", "1", "--ls"]).is_err());
        assert!(Cli::try_parse_from(["webeval", "--fetch", "b''"]).is_err());
    }

    #[test]
    fn repeated_vars() {
        let cli = Cli::try_parse_from(["webeval", "--eval", "a+b", "--var", "a=1", "--var", "b=2", "--sync"]).unwrap();
        assert_eq!(cli.vars, vec!["a=1", "b=2"]);
        assert!(cli.sync);
    }
}
