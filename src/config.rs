//! Immutable server configuration, built from command-line flags.
//!
//! Mirrors the hand-rolled-parser style this codebase already favors for
//! its own bespoke formats: no external flag-parsing DSL, just a small
//! loop over `std::env::args()`.

use std::fmt;

use crate::error::{Result, ServerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Fifo,
    Sff,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Fifo => write!(f, "FIFO"),
            Discipline::Sff => write!(f, "SFF"),
        }
    }
}

impl std::str::FromStr for Discipline {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Ok(Discipline::Fifo),
            "SFF" => Ok(Discipline::Sff),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub document_root: String,
    pub port: u16,
    pub threads: usize,
    pub queue_capacity: usize,
    pub discipline: Discipline,
    pub verbosity: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            document_root: ".".to_string(),
            port: 10000,
            threads: 1,
            queue_capacity: 1,
            discipline: Discipline::Fifo,
            verbosity: 0,
        }
    }
}

const USAGE: &str =
    "usage: sff_webserver [-d docroot] [-p port] [-t threads] [-b queue_capacity] [-s FIFO|SFF] [-v]";

/// Parses `argv` (excluding argv[0]) into a [`ServerConfig`].
///
/// Any malformed value or unrecognized flag is a hard error carrying the
/// usage string; `main` is responsible for printing it to stderr and
/// exiting with code 1.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ServerConfig> {
    let mut cfg = ServerConfig::default();
    let mut iter = args.into_iter();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "-d" => cfg.document_root = next_value(&mut iter, "-d")?,
            "-p" => cfg.port = parse_value(&mut iter, "-p")?,
            "-t" => {
                let n: i64 = parse_value(&mut iter, "-t")?;
                if n <= 0 {
                    return Err(usage_err("-t requires a positive integer"));
                }
                cfg.threads = n as usize;
            }
            "-b" => {
                let n: i64 = parse_value(&mut iter, "-b")?;
                if n <= 0 {
                    return Err(usage_err("-b requires a positive integer"));
                }
                cfg.queue_capacity = n as usize;
            }
            "-s" => {
                let value = next_value(&mut iter, "-s")?;
                cfg.discipline = value
                    .parse()
                    .map_err(|_| usage_err("-s requires FIFO or SFF"))?;
            }
            "-v" => cfg.verbosity = cfg.verbosity.saturating_add(1),
            other => return Err(usage_err(&format!("unknown flag {other}"))),
        }
    }

    Ok(cfg)
}

fn usage_err(reason: &str) -> ServerError {
    ServerError::Usage(format!("{reason}\n{USAGE}"))
}

fn next_value<I: Iterator<Item = String>>(iter: &mut I, flag: &str) -> Result<String> {
    iter.next()
        .ok_or_else(|| usage_err(&format!("{flag} requires a value")))
}

fn parse_value<I: Iterator<Item = String>, T: std::str::FromStr>(
    iter: &mut I,
    flag: &str,
) -> Result<T> {
    let raw = next_value(iter, flag)?;
    raw.parse()
        .map_err(|_| usage_err(&format!("{flag} requires a valid value, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = parse_args(args(&[])).unwrap();
        assert_eq!(cfg.port, 10000);
        assert_eq!(cfg.threads, 1);
        assert_eq!(cfg.queue_capacity, 1);
        assert_eq!(cfg.discipline, Discipline::Fifo);
    }

    #[test]
    fn test_full_flags() {
        let cfg = parse_args(args(&[
            "-d", "/srv/www", "-p", "8080", "-t", "4", "-b", "8", "-s", "SFF",
        ]))
        .unwrap();
        assert_eq!(cfg.document_root, "/srv/www");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.threads, 4);
        assert_eq!(cfg.queue_capacity, 8);
        assert_eq!(cfg.discipline, Discipline::Sff);
    }

    #[test]
    fn test_case_insensitive_discipline() {
        let cfg = parse_args(args(&["-s", "sff"])).unwrap();
        assert_eq!(cfg.discipline, Discipline::Sff);
    }

    #[test]
    fn test_rejects_zero_threads() {
        assert!(parse_args(args(&["-t", "0"])).is_err());
    }

    #[test]
    fn test_rejects_negative_queue_capacity() {
        assert!(parse_args(args(&["-b", "-3"])).is_err());
    }

    #[test]
    fn test_rejects_bad_discipline() {
        assert!(parse_args(args(&["-s", "LIFO"])).is_err());
    }

    #[test]
    fn test_rejects_unknown_flag() {
        assert!(parse_args(args(&["-x", "1"])).is_err());
    }

    #[test]
    fn test_rejects_missing_value() {
        assert!(parse_args(args(&["-p"])).is_err());
    }
}
