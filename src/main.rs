use machquote::{catalog, engine, report, Catalog, CatalogError, MachiningInput};
use std::fs;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum Error {
    Io(std::io::Error),
    Input(serde_json::Error),
    Catalog(CatalogError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{}", e),
            Error::Input(e) => write!(f, "malformed input: {}", e),
            Error::Catalog(e) => write!(f, "{}", e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Input(e)
    }
}

impl From<CatalogError> for Error {
    fn from(e: CatalogError) -> Self {
        Error::Catalog(e)
    }
}

fn usage() -> ! {
    eprintln!("Usage: machquote <input.json> [catalog.json] [--json]");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  machquote demos/bracket.json");
    std::process::exit(1);
}

fn run(input_path: &str, catalog_path: Option<&str>, json: bool) -> Result<bool, Error> {
    let input = MachiningInput::from_json(&fs::read_to_string(input_path)?)?;
    let catalog = match catalog_path {
        Some(path) => Catalog::from_file(path)?,
        None => catalog::default_catalog(),
    };

    let result = match engine::compute(&input, &catalog) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", report::render_failure(&e));
            return Ok(false);
        }
    };

    for error in &result.formula_errors {
        eprintln!("{}", report::render_formula_error(error));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", report::render_result(&result));
    }
    Ok(true)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let paths: Vec<&str> = args.iter().filter(|a| *a != "--json").map(|s| s.as_str()).collect();

    let (input_path, catalog_path) = match paths.as_slice() {
        [input] => (*input, None),
        [input, catalog] => (*input, Some(*catalog)),
        _ => usage(),
    };

    match run(input_path, catalog_path, json) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Results unavailable: {}", e);
            std::process::exit(1);
        }
    }
}
