mod cli;

use std::fs;
use std::io;

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use webeval::{
    config::Config,
    gallery::{controls::parse_tag_values, ListingQuery},
    printer::ValuePrinter,
    resource::{build_resource_url, ResourceFetcher},
    tui,
    utils::{data_url, decode_base64, parse_var_args},
    webeval::{coerce_string_list, snippets, vars, EvalClient, Vars},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so stdout stays clean for values and URLs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WEBEVAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    // Load config, then apply command-line overrides
    let mut cfg = Config::load();
    if let Some(url) = &args.base_url {
        cfg.set("WEBEVAL_BASE_URL", url.as_str());
    }
    if let Some(n) = args.page_size {
        cfg.set("PAGE_SIZE", n.to_string());
    }
    if let Some(path) = &args.selection_file {
        cfg.set("SELECTION_PATH", path.to_string_lossy());
    }
    if let Some(q) = &args.path_query {
        cfg.set("PATH_QUERY", q.as_str());
    }
    if !args.path_vars.is_empty() {
        cfg.set("PATH_VARS", args.path_vars.join(" "));
    }
    if args.no_bootstrap {
        cfg.set("DISABLE_BOOTSTRAP", "true");
    }
    debug!(endpoint = %cfg.evaluate_url(), config = %cfg.config_path.display(), "configuration loaded");

    let colored = if args.no_color {
        false
    } else if args.color {
        true
    } else {
        io::stdout().is_terminal()
    };
    let printer = ValuePrinter { colored };

    let content_type = args
        .content_type
        .clone()
        .or_else(|| cfg.get("CONTENT_TYPE"))
        .unwrap_or_else(|| "image/png".to_string());

    if args.gallery {
        return tui::run_gallery(&cfg).await;
    }

    if let Some(expr) = &args.resource_url {
        let filename = args.filename.as_deref().unwrap_or_default();
        println!("{}", build_resource_url(&cfg.resource_base(), filename, expr, &content_type, args.cache_key));
        return Ok(());
    }

    if let Some(expr) = &args.fetch {
        let out = args.out.as_ref().context("--fetch requires --out")?;
        let filename = args.filename.as_deref().unwrap_or_default();
        let url = build_resource_url(&cfg.resource_base(), filename, expr, &content_type, args.cache_key);
        let fetcher = ResourceFetcher::from_config(&cfg)?;
        let bytes = fetcher.fetch(&url).await?;
        write_output(out, &bytes)?;
        info!(bytes = bytes.len(), out = %out.display(), "resource saved");
        return Ok(());
    }

    let client = EvalClient::from_config(&cfg)?;

    if let Some(code) = &args.eval {
        let bindings = parse_var_args(&args.vars)?;
        let result = client.evaluate(code, bindings, args.sync).await?;
        if args.raw {
            printer.print(&serde_json::to_value(&result)?);
            return Ok(());
        }
        match result.into_value() {
            Ok(value) => printer.print(&value),
            Err(e) => {
                printer.print_error(&e.to_string());
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    if args.ls {
        let files = client.exeval_list(snippets::LIST_DIRECTORY, Vars::new(), false).await;
        printer.print_list(&files);
        return Ok(());
    }

    if let Some(path) = &args.cat {
        let value = client
            .exeval(snippets::READ_BASE64, vars([("f", json!(path))]), false)
            .await?;
        let Some(encoded) = value.as_str() else {
            bail!("expected base64 text for {}, got {}", path, value);
        };
        match &args.out {
            Some(out) => write_output(out, &decode_base64(encoded)?)?,
            None => println!("{}", data_url(&content_type, encoded)),
        }
        return Ok(());
    }

    if args.list {
        if !cfg.get_bool("DISABLE_BOOTSTRAP") {
            client.exeval(snippets::BOOTSTRAP, Vars::new(), true).await?;
        }
        let query = ListingQuery {
            query: cfg.get("PATH_QUERY").unwrap_or_default(),
            vars: parse_tag_values(&cfg.get("PATH_VARS").unwrap_or_default())
                .map_err(anyhow::Error::msg)?,
        };
        let (code, bindings) = query.to_call();
        let paths = coerce_string_list(client.exeval(&code, bindings, false).await?);
        printer.print_list(&paths);
        return Ok(());
    }

    bail!("no mode given; try --eval, --list or --gallery (see --help)")
}

fn write_output(out: &std::path::Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, bytes).with_context(|| format!("failed to write {}", out.display()))
}
