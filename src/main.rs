use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Arg, Command};
use log::{error, info};

use fsm2lut::config::{Config, SourceType};
use fsm2lut::{lut, FsmProgram};

fn parse_args() -> Config {
    let matches = Command::new("fsm2lut")
        .about("Compile a symbolic FSM program into a binary LUT image")
        .arg(
            Arg::new("input")
                .help("Program description file (YAML or JSON); stdin when omitted")
                .short('i')
                .long("input")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .help("Output path of the LUT image")
                .short('o')
                .long("output")
                .value_name("FILE")
                .default_value("lut.bin")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("format")
                .help("Input format (inferred from the file extension by default)")
                .long("format")
                .value_name("FORMAT")
                .value_parser(["yaml", "json"]),
        )
        .arg(
            Arg::new("truth_table")
                .help("Print the output truth table of one state instead of encoding")
                .long("truth-table")
                .value_name("STATE")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("log_level")
                .long("log")
                .short('l')
                .help(format!(
                    "Choose which messages to log (overrides {})",
                    env_logger::DEFAULT_FILTER_ENV
                ))
                .value_name("LEVEL")
                .value_parser(["off", "error", "warn", "info", "debug", "trace"]),
        )
        .version(concat!(
            env!("CARGO_PKG_VERSION"),
            include_str!(concat!(env!("OUT_DIR"), "/commit-info.txt"))
        ))
        .get_matches();

    let input = matches.get_one::<PathBuf>("input").cloned();
    let source_type = match matches.get_one::<String>("format") {
        // The value parser only lets known format names through.
        Some(f) => SourceType::from_extension(f).unwrap_or_default(),
        None => input
            .as_deref()
            .map(SourceType::from_path)
            .unwrap_or_default(),
    };

    Config {
        input,
        output: matches.get_one::<PathBuf>("output").cloned(),
        source_type,
        log_level: matches.get_one::<String>("log_level").cloned(),
        truth_table: matches.get_one::<usize>("truth_table").copied(),
    }
}

fn setup_logging(config: &Config) {
    // * Log at info by default.
    // * Allow users the option of setting complex logging filters using
    //   env_logger's `RUST_LOG` environment variable.
    // * Override both of those if the logging level is set via the `--log`
    //   command line argument.
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info");
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp(None);

    let log_lvl_from_env = std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some();

    if log_lvl_from_env {
        log::set_max_level(log::LevelFilter::Trace);
    } else {
        let level = match config.log_level.as_deref() {
            Some(lvl) => lvl.parse().unwrap_or(log::LevelFilter::Info),
            None => log::LevelFilter::Info,
        };
        log::set_max_level(level);
        builder.filter_level(level);
    }

    builder.init();
}

fn load_program(config: &Config) -> Result<FsmProgram> {
    let mut src = String::new();
    match &config.input {
        Some(path) => {
            File::open(path)
                .with_context(|| format!("couldn't open {}", path.display()))?
                .read_to_string(&mut src)
                .with_context(|| format!("couldn't read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .lock()
                .read_to_string(&mut src)
                .context("couldn't read from stdin")?;
        }
    }

    let program: FsmProgram = match config.source_type {
        #[cfg(feature = "yaml")]
        SourceType::Yaml => {
            serde_yaml::from_str(&src).context("couldn't parse the YAML program description")?
        }
        #[cfg(feature = "json")]
        SourceType::Json => {
            serde_json::from_str(&src).context("couldn't parse the JSON program description")?
        }
        #[allow(unreachable_patterns)]
        other => bail!("support for {other:?} input wasn't compiled in"),
    };

    info!(
        "loaded {} record(s), geometry state_w={} input_w={} output_w={} data_w={}",
        program.records().len(),
        program.state_w,
        program.input_w,
        program.output_w,
        program.data_w
    );
    Ok(program)
}

fn run(config: &Config) -> Result<()> {
    let program = load_program(config)?;

    if let Some(state) = config.truth_table {
        let stdout = io::stdout();
        lut::truth_table(&program, state, &mut stdout.lock())?;
        return Ok(());
    }

    let image = lut::encode(&program)?;

    // The image is complete before any file is touched; a failed run must
    // never leave a truncated image at the final path.
    let output = config.output.clone().unwrap_or_else(|| "lut.bin".into());
    let tmp = output.with_extension("bin.tmp");
    std::fs::write(&tmp, &image)
        .with_context(|| format!("couldn't write {}", tmp.display()))?;
    std::fs::rename(&tmp, &output)
        .with_context(|| format!("couldn't move the image to {}", output.display()))?;

    info!("wrote {} bytes to {}", image.len(), output.display());
    Ok(())
}

fn main() {
    let config = parse_args();
    setup_logging(&config);

    if let Err(e) = run(&config) {
        error!("{e}");
        for cause in e.chain().skip(1) {
            error!("caused by: {cause}");
        }
        process::exit(1);
    }
}
