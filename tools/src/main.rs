//! loan-sim: headless runner for the loan simulation core.
//!
//! Usage:
//!   loan-sim simulate 10000.00 12 --db loans.db
//!   loan-sim get 3
//!   loan-sim list 1 20
//!   loan-sim report 2024-03-07 2
//!   loan-sim products
//!   loan-sim --ipc-mode --db loans.db      (JSON lines on stdin/stdout)

use anyhow::Result;
use loansim_core::{
    config::LoanConfig,
    store::SimStore,
    types::parse_amount,
    LoanError, LoanResult, SimulationOrchestrator, SimulationRequest,
};
use serde::Serialize;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Simulate {
        amount: String,
        term: u32,
    },
    Get {
        id: i64,
    },
    List {
        #[serde(default = "first_page")]
        page: u32,
        #[serde(default = "default_page_size")]
        page_size: u32,
    },
    Report {
        #[serde(default)]
        date: Option<String>,
        #[serde(default)]
        product: Option<i64>,
    },
    Products,
    Quit,
}

fn first_page() -> u32 { 1 }
fn default_page_size() -> u32 { 10 }

/// Flags that take a value; everything else that is not a flag is positional.
const VALUE_FLAGS: [&str; 2] = ["--db", "--data-dir"];

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let positional = positional_args(&args);

    let config = LoanConfig::load(data_dir)?;
    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    store.migrate()?;
    let orchestrator = SimulationOrchestrator::build(&config, Arc::new(store))?;

    log::info!(
        "loan-sim: db={db} data_dir={data_dir} products={}",
        config.products.len()
    );

    if ipc_mode {
        let result = run_ipc_loop(&orchestrator);
        orchestrator.flush_notifications();
        return result;
    }

    let Some((command, rest)) = positional.split_first() else {
        eprintln!("usage: loan-sim <simulate|get|list|report|products> [args] [--db PATH] [--data-dir DIR]");
        std::process::exit(2);
    };

    let failed = match run_command(&orchestrator, command, rest) {
        Ok(json) => {
            println!("{json}");
            false
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_body())?);
            true
        }
    };
    orchestrator.flush_notifications();
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn run_command(
    orchestrator: &SimulationOrchestrator,
    command: &str,
    rest: &[&str],
) -> LoanResult<String> {
    match command {
        "simulate" => {
            let amount = parse_amount(rest.first().copied().unwrap_or_default())?;
            let term = parse_positional(rest, 1, "term", None)?;
            pretty(&orchestrator.simulate(SimulationRequest { amount, term })?)
        }
        "get" => {
            let id = parse_positional(rest, 0, "id", None)?;
            pretty(&orchestrator.get_by_id(id)?)
        }
        "list" => {
            let page = parse_positional(rest, 0, "page", Some(first_page()))?;
            let page_size = parse_positional(rest, 1, "page_size", Some(default_page_size()))?;
            pretty(&orchestrator.list(page, page_size)?)
        }
        "report" => {
            let date = rest.first().copied().filter(|d| *d != "-");
            let product = rest
                .get(1)
                .map(|raw| {
                    raw.parse::<i64>()
                        .map_err(|_| LoanError::invalid_parameter("product", format!("'{raw}' is not a product code")))
                })
                .transpose()?;
            pretty(&orchestrator.query_by_product_and_date(date, product)?)
        }
        "products" => pretty(&orchestrator.products()?),
        other => Err(LoanError::invalid_parameter(
            "command",
            format!("unknown command '{other}'"),
        )),
    }
}

fn run_ipc_loop(orchestrator: &SimulationOrchestrator) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Simulate { amount, term } => parse_amount(&amount)
                .and_then(|amount| orchestrator.simulate(SimulationRequest { amount, term }))
                .and_then(|r| to_json(&r)),
            IpcCommand::Get { id } => orchestrator.get_by_id(id).and_then(|r| to_json(&r)),
            IpcCommand::List { page, page_size } => {
                orchestrator.list(page, page_size).and_then(|r| to_json(&r))
            }
            IpcCommand::Report { date, product } => orchestrator
                .query_by_product_and_date(date.as_deref(), product)
                .and_then(|r| to_json(&r)),
            IpcCommand::Products => orchestrator.products().and_then(|r| to_json(&r)),
        };

        let line = match reply {
            Ok(value) => value,
            Err(e) => serde_json::to_value(e.to_body())?,
        };
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn pretty<T: Serialize>(value: &T) -> LoanResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn to_json<T: Serialize>(value: &T) -> LoanResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if !arg.starts_with("--") {
            out.push(arg.as_str());
        }
    }
    out
}

fn parse_positional<T: std::str::FromStr>(
    rest: &[&str],
    idx: usize,
    name: &'static str,
    default: Option<T>,
) -> LoanResult<T> {
    match (rest.get(idx), default) {
        (Some(raw), _) => raw
            .parse()
            .map_err(|_| LoanError::invalid_parameter(name, format!("'{raw}' is not valid"))),
        (None, Some(d)) => Ok(d),
        (None, None) => Err(LoanError::invalid_parameter(name, "missing")),
    }
}
