//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::{error_json, to_json, JsonReportAdapter};
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_strategy_params, DEFAULT_INITIAL_CAPITAL,
};
use crate::domain::error::StratlabError;
use crate::domain::metrics::{MetricValue, PerformanceReport};
use crate::domain::portfolio::TradeType;
use crate::domain::rule::Rule;
use crate::domain::rule_parser;
use crate::domain::strategy::{CustomRules, StrategyKind, StrategyParams};
use crate::domain::universe::{load_instruments, parse_tickers};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "stratlab", about = "Daily-bar strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy INI overriding the config's [strategy] section
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List tickers known to the data source
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Dump bars for a ticker as CSV
    Data {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Show data range for a ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            output,
            ticker,
            dry_run,
        } => run_backtest(
            &config,
            strategy.as_deref(),
            output.as_deref(),
            ticker.as_deref(),
            dry_run,
        ),
        Command::ListTickers { config } => report_outcome(run_list_tickers(&config)),
        Command::Data {
            config,
            ticker,
            start,
            end,
        } => report_outcome(run_data(&config, &ticker, start, end)),
        Command::Info { config, ticker } => report_outcome(run_info(&config, &ticker)),
        Command::Validate { strategy } => report_outcome(run_validate(&strategy)),
    }
}

fn report_outcome(result: Result<(), StratlabError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StratlabError> {
    FileConfigAdapter::from_file(path)
}

/// Everything a run needs from the `[backtest]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub tickers: Vec<String>,
    pub initial_capital: f64,
    pub data_start: NaiveDate,
    pub data_end: NaiveDate,
    pub simulation_start: NaiveDate,
}

impl BacktestSettings {
    pub fn engine_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.initial_capital,
            simulation_start: self.simulation_start,
        }
    }
}

pub fn build_backtest_settings(
    config: &dyn ConfigPort,
    ticker_override: Option<&str>,
) -> Result<BacktestSettings, StratlabError> {
    let raw_tickers = match ticker_override {
        Some(t) => t.to_string(),
        None => config
            .get_string("backtest", "tickers")
            .or_else(|| config.get_string("backtest", "ticker"))
            .ok_or_else(|| StratlabError::ConfigMissing {
                section: "backtest".into(),
                key: "ticker".into(),
            })?,
    };
    let tickers = parse_tickers(&raw_tickers).map_err(|e| StratlabError::ConfigInvalid {
        section: "backtest".into(),
        key: "ticker".into(),
        reason: e.to_string(),
    })?;

    Ok(BacktestSettings {
        tickers,
        initial_capital: config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        data_start: parse_date(config, "data_start_date")?,
        data_end: parse_date(config, "data_end_date")?,
        simulation_start: parse_date(config, "simulation_start_date")?,
    })
}

fn read_usize(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, StratlabError> {
    match config.get_string("strategy", key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| StratlabError::ConfigInvalid {
                section: "strategy".into(),
                key: key.into(),
                reason: format!("expected a non-negative integer, found '{}'", raw.trim()),
            }),
    }
}

fn read_f64(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, StratlabError> {
    match config.get_string("strategy", key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| StratlabError::ConfigInvalid {
                section: "strategy".into(),
                key: key.into(),
                reason: format!("expected a number, found '{}'", raw.trim()),
            }),
    }
}

fn read_rule(config: &dyn ConfigPort, key: &str) -> Result<Rule, StratlabError> {
    let text = config
        .get_string("strategy", key)
        .ok_or_else(|| StratlabError::ConfigMissing {
            section: "strategy".into(),
            key: key.into(),
        })?;
    rule_parser::parse(&text).map_err(|e| {
        eprintln!(
            "error: failed to parse {key}:\n{}",
            e.display_with_context(&text)
        );
        StratlabError::from(e)
    })
}

/// Reads and validates the `[strategy]` section. Missing numeric keys take
/// the variant's defaults.
pub fn build_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, StratlabError> {
    let name = config
        .get_string("strategy", "name")
        .ok_or_else(|| StratlabError::ConfigMissing {
            section: "strategy".into(),
            key: "name".into(),
        })?;
    let kind: StrategyKind = name.parse()?;

    let params = match StrategyParams::defaults(kind) {
        Some(StrategyParams::MaCrossover {
            short_window,
            long_window,
        }) => StrategyParams::MaCrossover {
            short_window: read_usize(config, "short_window", short_window)?,
            long_window: read_usize(config, "long_window", long_window)?,
        },
        Some(StrategyParams::BollingerBands {
            window,
            num_std_dev,
        }) => StrategyParams::BollingerBands {
            window: read_usize(config, "window", window)?,
            num_std_dev: read_f64(config, "num_std_dev", num_std_dev)?,
        },
        Some(StrategyParams::Macd { fast, slow, signal }) => StrategyParams::Macd {
            fast: read_usize(config, "fast", fast)?,
            slow: read_usize(config, "slow", slow)?,
            signal: read_usize(config, "signal", signal)?,
        },
        Some(StrategyParams::DonchianBreakout { window }) => StrategyParams::DonchianBreakout {
            window: read_usize(config, "window", window)?,
        },
        Some(StrategyParams::Stochastic {
            k_period,
            d_period,
            oversold,
            overbought,
        }) => StrategyParams::Stochastic {
            k_period: read_usize(config, "k_period", k_period)?,
            d_period: read_usize(config, "d_period", d_period)?,
            oversold: read_f64(config, "oversold", oversold)?,
            overbought: read_f64(config, "overbought", overbought)?,
        },
        Some(StrategyParams::Custom { .. }) | None => StrategyParams::Custom {
            rules: CustomRules {
                buy: read_rule(config, "buy_rule")?,
                sell: read_rule(config, "sell_rule")?,
            },
        },
    };

    validate_strategy_params(&params)?;
    Ok(params)
}

/// Opens the data source named by `[data] source` (default `csv`).
pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, StratlabError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.trim() {
        "csv" => {
            let dir = config
                .get_string("data", "csv_dir")
                .ok_or_else(|| StratlabError::ConfigMissing {
                    section: "data".into(),
                    key: "csv_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
            Ok(Box::new(adapter))
        }
        other => Err(StratlabError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unsupported data source '{other}'"),
        }),
    }
}

fn run_backtest(
    config_path: &Path,
    strategy_path: Option<&Path>,
    output_path: Option<&Path>,
    ticker_override: Option<&str>,
    dry_run: bool,
) -> ExitCode {
    match backtest_pipeline(config_path, strategy_path, output_path, ticker_override, dry_run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", error_json(&e.to_string()));
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn backtest_pipeline(
    config_path: &Path,
    strategy_path: Option<&Path>,
    output_path: Option<&Path>,
    ticker_override: Option<&str>,
    dry_run: bool,
) -> Result<(), StratlabError> {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;

    // Stage 2: Resolve strategy source
    let params = match strategy_path {
        Some(path) => {
            eprintln!("Loading strategy from {}", path.display());
            build_strategy_params(&load_config(path)?)?
        }
        None => build_strategy_params(&adapter)?,
    };
    eprintln!("Strategy: {params}");

    // Stage 3: Backtest settings
    let settings = build_backtest_settings(&adapter, ticker_override)?;

    if dry_run {
        eprintln!("  tickers:          {}", settings.tickers.join(", "));
        eprintln!("  initial capital:  {:.2}", settings.initial_capital);
        eprintln!(
            "  data range:       {} to {}",
            settings.data_start, settings.data_end
        );
        eprintln!("  simulation start: {}", settings.simulation_start);
        eprintln!("\nDry run complete: configuration is valid");
        return Ok(());
    }

    // Stage 4: Load data, simulate, and write output
    let data_port = open_data_port(&adapter)?;
    run_backtest_pipeline(data_port.as_ref(), &params, &settings, output_path)?;
    Ok(())
}

/// Loads the universe, runs the simulation and emits the report. Stages
/// after configuration, callable with any [`DataPort`].
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    params: &StrategyParams,
    settings: &BacktestSettings,
    output_path: Option<&Path>,
) -> Result<PerformanceReport, StratlabError> {
    let universe = load_instruments(
        data_port,
        &settings.tickers,
        settings.data_start,
        settings.data_end,
    )?;
    if !universe.skipped.is_empty() {
        eprintln!(
            "Using {} of {} tickers",
            universe.instruments.len(),
            settings.tickers.len()
        );
    }

    let report =
        backtest_engine::run_strategy(params, &universe.instruments, &settings.engine_config())?;

    print_summary(&report);
    match output_path {
        Some(path) => {
            let path_str = path.to_string_lossy();
            JsonReportAdapter::default().write(&report, &path_str)?;
            eprintln!("\nReport written to: {}", path.display());
        }
        None => println!("{}", to_json(&report, true)?),
    }
    Ok(report)
}

fn format_percent(value: &MetricValue) -> String {
    match value.value() {
        Some(v) => format!("{v:.2}%"),
        None => value.to_string(),
    }
}

fn print_summary(report: &PerformanceReport) {
    let buys = report
        .transactions
        .iter()
        .filter(|t| t.trade_type == TradeType::Buy)
        .count();
    let sells = report.transactions.len() - buys;

    eprintln!("\n=== Results ===");
    eprintln!("Initial Capital:  {:.2}", report.initial_capital);
    eprintln!("Final Value:      {:.2}", report.final_portfolio_value);
    eprintln!("Total Return:     {:.2}%", report.total_return_percent);
    eprintln!(
        "Annualized:       {}",
        format_percent(&report.annualized_return_percent)
    );
    eprintln!(
        "Volatility:       {}",
        format_percent(&report.annualized_volatility_percent)
    );
    eprintln!("Sharpe Ratio:     {}", report.sharpe_ratio);
    eprintln!("Sortino Ratio:    {}", report.sortino_ratio);
    eprintln!("Calmar Ratio:     {}", report.calmar_ratio);
    eprintln!(
        "Max Drawdown:     {}",
        format_percent(&report.max_drawdown_percent)
    );
    eprintln!("Trades:           {} buys, {} sells", buys, sells);
    if let Some(message) = &report.message {
        eprintln!("Note: {message}");
    }
}

fn run_list_tickers(config_path: &Path) -> Result<(), StratlabError> {
    let config = load_config(config_path)?;
    let data_port = open_data_port(&config)?;
    let tickers = data_port.list_tickers()?;

    if tickers.is_empty() {
        eprintln!("No tickers found");
    } else {
        for ticker in &tickers {
            println!("{ticker}");
        }
        eprintln!("{} tickers found", tickers.len());
    }
    Ok(())
}

fn run_data(
    config_path: &Path,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), StratlabError> {
    let config = load_config(config_path)?;
    let data_port = open_data_port(&config)?;
    let ticker = ticker.trim().to_uppercase();

    let bars = data_port.fetch_bars(
        &ticker,
        start.unwrap_or(NaiveDate::MIN),
        end.unwrap_or(NaiveDate::MAX),
    )?;
    if bars.is_empty() {
        return Err(StratlabError::NoData { ticker });
    }

    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    for bar in &bars {
        writer.serialize(bar).map_err(|e| StratlabError::Report {
            reason: e.to_string(),
        })?;
    }
    writer.flush()?;
    eprintln!("{} bars for {}", bars.len(), ticker);
    Ok(())
}

fn run_info(config_path: &Path, ticker: &str) -> Result<(), StratlabError> {
    let config = load_config(config_path)?;
    let data_port = open_data_port(&config)?;
    let ticker = ticker.trim().to_uppercase();

    match data_port.data_range(&ticker)? {
        Some((min_date, max_date, count)) => {
            println!("{ticker}: {count} bars, {min_date} to {max_date}");
            Ok(())
        }
        None => Err(StratlabError::NoData { ticker }),
    }
}

fn run_validate(strategy_path: &Path) -> Result<(), StratlabError> {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let adapter = load_config(strategy_path)?;
    let params = build_strategy_params(&adapter)?;

    if let StrategyParams::Custom { rules } = &params {
        eprintln!("\nBuy Rule:  {}", rules.buy);
        eprintln!("Sell Rule: {}", rules.sell);
    }
    eprintln!("Minimum history: {} bars", params.min_history());
    println!("{params}");
    eprintln!("\nStrategy configuration is valid.");
    Ok(())
}
