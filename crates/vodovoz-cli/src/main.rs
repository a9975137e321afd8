// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod dump;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use logging::LogSink;
use runtime::{ClientRuntime, DemoRuntime};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use vodovoz_app::ScreenState;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `vodovoz --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let interactive = !options.check_only && !options.dump;
    logging::init(
        config.log_level(),
        &LogSink::resolve(interactive, config.log_file()),
    )?;

    let client = if options.demo {
        None
    } else {
        Some(
            config.catalog_client().with_context(|| {
                format!(
                    "invalid [catalog] config in {}; fix endpoint/image_base_url/timeout values",
                    options.config_path.display()
                )
            })?,
        )
    };
    if options.check_only {
        return Ok(());
    }

    if options.dump {
        let catalog = match &client {
            Some(client) => client
                .fetch()
                .with_context(|| format!("fetch catalog from {}", client.endpoint()))?,
            None => vodovoz_testkit::demo_catalog(),
        };
        let mut stdout = io::stdout().lock();
        dump::write_catalog(&mut stdout, &catalog, config.image_base_url())?;
        stdout.flush().context("flush stdout")?;
        return Ok(());
    }

    let mut state = ScreenState {
        active_tab: config.start_tab(),
        ..ScreenState::default()
    };
    info!(tab = state.active_tab.key(), demo = options.demo, "starting screen");

    match client {
        Some(client) => vodovoz_tui::run_app(&mut state, &mut ClientRuntime::new(client)),
        None => vodovoz_tui::run_app(
            &mut state,
            &mut DemoRuntime::new(vodovoz_testkit::demo_catalog(), config.image_base_url()),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    dump: bool,
    demo: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        dump: false,
        demo: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--dump" => {
                options.dump = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("vodovoz");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and catalog client settings");
    println!("  --dump                   Fetch the catalog once and print it as text");
    println!("  --demo                   Use a built-in catalog instead of the network");
    println!("  --help                   Show this help");
}
