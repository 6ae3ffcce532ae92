use fontlift_core::{BuildMode, BuildSession, FontOptions};
use futures::executor::block_on;
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Font(fontlift_core::Error),
    NoGlobalFamilies,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Font(err) => write!(f, "{err}"),
            CliError::NoGlobalFamilies => write!(f, "No global font families configured"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<fontlift_core::Error> for CliError {
    fn from(value: fontlift_core::Error) -> Self {
        Self::Font(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Rewrite,
    Global,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    build: bool,
    variables: bool,
    id: Option<String>,
}

fn usage() -> &'static str {
    "fontlift\n\
\n\
USAGE:\n\
  fontlift [rewrite] [--config <file>] [--build] [--variables] [--id <module-id>] [<path>|-]\n\
  fontlift global --config <file>\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - <file> is a JSON font options document; only manual (`src`) family overrides resolve.\n\
  - rewrite prints the stylesheet with injected @font-face rules, or the input unchanged.\n\
  - --build minifies injected rules and uses production font URLs.\n\
  - --variables also rewrites custom properties holding font family lists.\n\
  - global prints the stylesheet for families marked `global`.\n\
  - Set RUST_LOG (e.g. RUST_LOG=debug) to see resolution logs on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "rewrite" => args.command = Command::Rewrite,
            "global" => args.command = Command::Global,
            "--build" => args.build = true,
            "--variables" => args.variables = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--id" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.id = Some(id.clone());
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if matches!(args.command, Command::Global) && (args.config.is_none() || args.input.is_some())
    {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_options(path: Option<&str>) -> Result<FontOptions, CliError> {
    match path {
        None => Ok(FontOptions::default()),
        Some(path) => Ok(FontOptions::from_json_str(&std::fs::read_to_string(path)?)?),
    }
}

fn module_id(args: &Args) -> String {
    if let Some(id) = &args.id {
        return id.clone();
    }
    match args.input.as_deref() {
        None | Some("-") => "stdin.css".to_string(),
        Some(path) => path.to_string(),
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let mut options = load_options(args.config.as_deref())?;
    let mode = if args.build {
        BuildMode::Build
    } else {
        BuildMode::Dev
    };
    if args.variables {
        options.experimental.process_css_variables = true;
    }
    let session = BuildSession::builder(options).mode(mode).build()?;
    block_on(session.setup())?;

    match args.command {
        Command::Rewrite => {
            let code = read_input(args.input.as_deref())?;
            let id = module_id(&args);
            let out = match block_on(session.transform(&code, &id)) {
                Some(out) => out,
                None => {
                    tracing::debug!(id, "stylesheet unchanged");
                    code
                }
            };
            print!("{out}");
        }
        Command::Global => {
            let css = block_on(session.global_stylesheet());
            if css.is_empty() {
                return Err(CliError::NoGlobalFamilies);
            }
            print!("{css}");
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_tracing();

    match run(args) {
        Ok(()) => {}
        Err(CliError::NoGlobalFamilies) => {
            eprintln!("{}", CliError::NoGlobalFamilies);
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
