//! wedge - terminal barcode scan decoder
//!
//! Attaches a scan handler to the terminal keystroke stream and prints each
//! completed barcode on its own line. Scanner keystrokes and human typing
//! share the same stream; the selected handler tells them apart.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing_subscriber::EnvFilter;

use wedge_core::{
    DelimitedConfig, DelimitedScanner, KeyStroke, PrefixedConfig, PrefixedScanner, ScanHandler,
};
use wedge_term::{ScanListener, TerminalKeys};

/// Which handler strategy to run.
enum Strategy {
    Delimited {
        capture_prefix: String,
        capture_suffix: String,
    },
    Prefixed {
        prefix: Option<Vec<String>>,
        include_prefix: bool,
        timeout: Duration,
    },
}

struct Options {
    strategy: Strategy,
}

const USAGE: &str = "\
wedge - decode barcode scans from terminal keystrokes

USAGE:
    wedge [OPTIONS]

OPTIONS (delimited mode, the default):
    --capture-prefix <KEY>   start sentinel key (default F18)
    --capture-suffix <KEY>   end sentinel key (default F19)

OPTIONS (prefixed mode):
    --prefixed               use the prefix/timeout handler
    --prefix <K1,K2,...>     prefix key sequence (default: none, capture all)
    --timeout-ms <N>         inactivity timeout in milliseconds (default 200)
    --include-prefix         include the prefix keys in the output

Press Escape to quit.
";

fn parse_options(args: &[String]) -> anyhow::Result<Options> {
    let mut prefixed = false;
    let mut capture_prefix = None;
    let mut capture_suffix = None;
    let mut prefix = None;
    let mut include_prefix = false;
    let mut timeout = Duration::from_millis(200);

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{name} requires a value"))
        };
        match arg.as_str() {
            "--prefixed" => prefixed = true,
            "--include-prefix" => include_prefix = true,
            "--capture-prefix" => capture_prefix = Some(value("--capture-prefix")?),
            "--capture-suffix" => capture_suffix = Some(value("--capture-suffix")?),
            "--prefix" => {
                let keys = value("--prefix")?;
                prefix = Some(keys.split(',').map(str::to_string).collect::<Vec<_>>());
            }
            "--timeout-ms" => {
                let ms: u64 = value("--timeout-ms")?
                    .parse()
                    .context("--timeout-ms must be a number")?;
                timeout = Duration::from_millis(ms);
            }
            "--help" | "-h" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(anyhow!("unknown option {other} (try --help)")),
        }
    }

    let strategy = if prefixed {
        Strategy::Prefixed {
            prefix,
            include_prefix,
            timeout,
        }
    } else {
        if prefix.is_some() || include_prefix {
            return Err(anyhow!("--prefix/--include-prefix require --prefixed"));
        }
        let defaults = DelimitedConfig::default();
        Strategy::Delimited {
            capture_prefix: capture_prefix.unwrap_or(defaults.capture_prefix),
            capture_suffix: capture_suffix.unwrap_or(defaults.capture_suffix),
        }
    };

    Ok(Options { strategy })
}

/// Wrapper that quits on Escape and forwards everything else.
struct QuitOnEscape {
    inner: Box<dyn ScanHandler>,
    quit: Arc<AtomicBool>,
}

impl ScanHandler for QuitOnEscape {
    fn handle_key(&mut self, event: &mut KeyStroke, now: Instant) {
        if event.key() == "Escape" {
            self.quit.store(true, Ordering::Relaxed);
            return;
        }
        self.inner.handle_key(event, now);
    }

    fn tick(&mut self, now: Instant) {
        self.inner.tick(now);
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.inner.next_deadline()
    }
}

fn build_handler(
    strategy: Strategy,
    scan_tx: crossbeam_channel::Sender<String>,
) -> anyhow::Result<Box<dyn ScanHandler>> {
    let on_scan = move |barcode: String| {
        let _ = scan_tx.send(barcode);
    };

    match strategy {
        Strategy::Delimited {
            capture_prefix,
            capture_suffix,
        } => Ok(Box::new(DelimitedScanner::new(
            DelimitedConfig {
                capture_prefix,
                capture_suffix,
                ..Default::default()
            },
            on_scan,
        ))),
        Strategy::Prefixed {
            prefix,
            include_prefix,
            timeout,
        } => {
            let scanner = PrefixedScanner::new(
                PrefixedConfig {
                    prefix,
                    include_prefix_in_output: include_prefix,
                    scan_timeout: timeout,
                    ..Default::default()
                },
                on_scan,
            )?;
            Ok(Box::new(scanner))
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_options(&args)?;

    let (scan_tx, scan_rx) = crossbeam_channel::unbounded();
    let quit = Arc::new(AtomicBool::new(false));
    let handler = Box::new(QuitOnEscape {
        inner: build_handler(options.strategy, scan_tx)?,
        quit: quit.clone(),
    });

    enable_raw_mode()?;
    let listener = ScanListener::attach(TerminalKeys, handler);
    tracing::info!("listening for scans, press Escape to quit");

    let result = print_scans(&scan_rx, &quit);

    listener.detach();
    disable_raw_mode()?;

    result
}

fn print_scans(
    scan_rx: &crossbeam_channel::Receiver<String>,
    quit: &AtomicBool,
) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    while !quit.load(Ordering::Relaxed) {
        match scan_rx.recv_timeout(Duration::from_millis(100)) {
            // Raw mode: explicit carriage return.
            Ok(barcode) => {
                write!(stdout, "{barcode}\r\n")?;
                stdout.flush()?;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
