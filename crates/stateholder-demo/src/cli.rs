#![forbid(unsafe_code)]

//! Command-line argument parsing for the counter demo.
//!
//! Arguments are parsed by hand. Every option also has a
//! `STATEHOLDER_DEMO_*` environment override; explicit flags win.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
StateHolder Counter Demo

USAGE:
    stateholder-demo [OPTIONS]

OPTIONS:
    --ticks=N            Number of ticker items merged into the state (default: 10)
    --tick-ms=N          Ticker cadence in milliseconds (default: 50)
    --clicks=N           Scripted double-taps on increment (default: 6)
    --debounce-ms=N      Debounce window for taps in milliseconds (default: 100)
    --milestone=N        Emit a milestone event every N counts (default: 5)
    --quiet              Skip per-change state logging
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    STATEHOLDER_DEMO_TICKS        Override --ticks
    STATEHOLDER_DEMO_TICK_MS      Override --tick-ms
    STATEHOLDER_DEMO_CLICKS       Override --clicks
    STATEHOLDER_DEMO_DEBOUNCE_MS  Override --debounce-ms
    STATEHOLDER_DEMO_MILESTONE    Override --milestone
    STATEHOLDER_DEMO_QUIET        Override --quiet (1/true to enable)
    RUST_LOG                      Log filter (default: info)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Ticker items to merge before exiting.
    pub ticks: u64,
    /// Ticker cadence in milliseconds.
    pub tick_ms: u64,
    /// Scripted double-taps; the second tap of each pair is debounced.
    pub clicks: u32,
    /// Debounce window in milliseconds.
    pub debounce_ms: u64,
    /// Milestone interval (0 = disabled).
    pub milestone: i64,
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            ticks: 10,
            tick_ms: 50,
            clicks: 6,
            debounce_ms: 100,
            milestone: 5,
            quiet: false,
        }
    }
}

fn is_truthy(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl Opts {
    /// Parse command-line arguments and environment variables.
    ///
    /// Environment variables take precedence over defaults but are overridden
    /// by explicit command-line flags.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("stateholder-demo {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(1);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(val) = get_env("STATEHOLDER_DEMO_TICKS")
            && let Ok(n) = val.trim().parse()
        {
            opts.ticks = n;
        }
        if let Some(val) = get_env("STATEHOLDER_DEMO_TICK_MS")
            && let Ok(n) = val.trim().parse()
        {
            opts.tick_ms = n;
        }
        if let Some(val) = get_env("STATEHOLDER_DEMO_CLICKS")
            && let Ok(n) = val.trim().parse()
        {
            opts.clicks = n;
        }
        if let Some(val) = get_env("STATEHOLDER_DEMO_DEBOUNCE_MS")
            && let Ok(n) = val.trim().parse::<u64>()
            && n > 0
        {
            opts.debounce_ms = n;
        }
        if let Some(val) = get_env("STATEHOLDER_DEMO_MILESTONE")
            && let Ok(n) = val.trim().parse::<i64>()
            && n >= 0
        {
            opts.milestone = n;
        }
        if let Some(val) = get_env("STATEHOLDER_DEMO_QUIET") {
            opts.quiet = is_truthy(val.trim());
        }

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                "--quiet" => opts.quiet = true,
                other => {
                    if let Some(val) = other.strip_prefix("--ticks=") {
                        opts.ticks = parse_value("--ticks", val)?;
                    } else if let Some(val) = other.strip_prefix("--tick-ms=") {
                        opts.tick_ms = parse_value("--tick-ms", val)?;
                    } else if let Some(val) = other.strip_prefix("--clicks=") {
                        opts.clicks = parse_value("--clicks", val)?;
                    } else if let Some(val) = other.strip_prefix("--debounce-ms=") {
                        let ms: u64 = parse_value("--debounce-ms", val)?;
                        if ms == 0 {
                            return Err(ParseError::InvalidValue {
                                flag: "--debounce-ms",
                                value: val.to_string(),
                            });
                        }
                        opts.debounce_ms = ms;
                    } else if let Some(val) = other.strip_prefix("--milestone=") {
                        let n: i64 = parse_value("--milestone", val)?;
                        if n < 0 {
                            return Err(ParseError::InvalidValue {
                                flag: "--milestone",
                                value: val.to_string(),
                            });
                        }
                        opts.milestone = n;
                    } else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    }
                }
            }
        }

        Ok(opts)
    }
}

fn parse_value<T: std::str::FromStr>(flag: &'static str, val: &str) -> Result<T, ParseError> {
    val.parse().map_err(|_| ParseError::InvalidValue {
        flag,
        value: val.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with_env<I, S>(
        args: I,
        env_pairs: &[(&'static str, &'static str)],
    ) -> Result<Opts, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = std::collections::HashMap::new();
        for (key, value) in env_pairs {
            map.insert(*key, *value);
        }
        Opts::parse_from_env_and_args(args, |key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn default_opts() {
        let opts = Opts::default();
        assert_eq!(opts.ticks, 10);
        assert_eq!(opts.tick_ms, 50);
        assert_eq!(opts.clicks, 6);
        assert_eq!(opts.debounce_ms, 100);
        assert_eq!(opts.milestone, 5);
        assert!(!opts.quiet);
    }

    #[test]
    fn no_args_no_env_is_default() {
        let opts = parse_with_env(Vec::<String>::new(), &[]).unwrap();
        assert_eq!(opts, Opts::default());
    }

    #[test]
    fn flags_parse() {
        let opts = parse_with_env(
            ["--ticks=3", "--tick-ms=5", "--clicks=2", "--debounce-ms=40", "--quiet"],
            &[],
        )
        .unwrap();
        assert_eq!(opts.ticks, 3);
        assert_eq!(opts.tick_ms, 5);
        assert_eq!(opts.clicks, 2);
        assert_eq!(opts.debounce_ms, 40);
        assert!(opts.quiet);
    }

    #[test]
    fn env_overrides_defaults() {
        let opts = parse_with_env(
            Vec::<String>::new(),
            &[
                ("STATEHOLDER_DEMO_TICKS", "7"),
                ("STATEHOLDER_DEMO_QUIET", "TRUE"),
                ("STATEHOLDER_DEMO_MILESTONE", "0"),
            ],
        )
        .unwrap();
        assert_eq!(opts.ticks, 7);
        assert!(opts.quiet);
        assert_eq!(opts.milestone, 0);
    }

    #[test]
    fn flags_override_env() {
        let opts =
            parse_with_env(["--ticks=2"], &[("STATEHOLDER_DEMO_TICKS", "9")]).unwrap();
        assert_eq!(opts.ticks, 2);
    }

    #[test]
    fn invalid_env_is_ignored() {
        let opts = parse_with_env(
            Vec::<String>::new(),
            &[
                ("STATEHOLDER_DEMO_TICK_MS", "fast"),
                ("STATEHOLDER_DEMO_DEBOUNCE_MS", "0"),
            ],
        )
        .unwrap();
        assert_eq!(opts.tick_ms, 50);
        assert_eq!(opts.debounce_ms, 100);
    }

    #[test]
    fn invalid_flag_value_is_rejected() {
        assert_eq!(
            parse_with_env(["--ticks=many"], &[]),
            Err(ParseError::InvalidValue {
                flag: "--ticks",
                value: "many".into()
            })
        );
        assert!(matches!(
            parse_with_env(["--debounce-ms=0"], &[]),
            Err(ParseError::InvalidValue { flag: "--debounce-ms", .. })
        ));
        assert!(matches!(
            parse_with_env(["--milestone=-1"], &[]),
            Err(ParseError::InvalidValue { flag: "--milestone", .. })
        ));
    }

    #[test]
    fn help_and_version() {
        assert_eq!(parse_with_env(["-h"], &[]), Err(ParseError::Help));
        assert_eq!(parse_with_env(["--version"], &[]), Err(ParseError::Version));
    }

    #[test]
    fn unknown_arg() {
        assert_eq!(
            parse_with_env(["--bogus"], &[]),
            Err(ParseError::UnknownArg("--bogus".into()))
        );
    }

    #[test]
    fn help_text_lists_env_overrides() {
        for key in [
            "STATEHOLDER_DEMO_TICKS",
            "STATEHOLDER_DEMO_TICK_MS",
            "STATEHOLDER_DEMO_CLICKS",
            "STATEHOLDER_DEMO_DEBOUNCE_MS",
            "STATEHOLDER_DEMO_MILESTONE",
            "STATEHOLDER_DEMO_QUIET",
        ] {
            assert!(HELP_TEXT.contains(key), "{key} missing from help");
        }
    }
}
