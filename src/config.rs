use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "kafka-consumer-pool")]
#[command(about = "Pool of Kafka consumers that poll and log records until terminated")]
pub struct Args {
    /// Number of consumers
    #[arg(short = 'c', long = "consumers-num")]
    pub consumers_num: NonZeroUsize,

    /// List of topics
    #[arg(short = 't', long = "topics", num_args = 1.., required = true)]
    pub topics: Vec<String>,

    /// Kafka properties location
    #[arg(short = 'k', long = "kafka-properties")]
    pub kafka_properties: PathBuf,
}

/// Validated startup parameters, consumed once at launch.
pub struct LaunchConfig {
    pub consumers: usize,
    /// Topic set shared read-only by all workers.
    pub topics: Arc<[String]>,
    /// Connection properties; each worker derives its own client config
    /// from these pairs.
    pub properties: Vec<(String, String)>,
}

impl LaunchConfig {
    /// Parses the command line and loads the properties file, exiting with
    /// status 1 on any startup failure. No worker is dispatched before this
    /// returns.
    pub fn load() -> Self {
        let args = match Args::try_parse() {
            Ok(args) => args,
            Err(e) => {
                let _ = e.print();
                std::process::exit(1);
            }
        };

        let path = args.kafka_properties.display().to_string();
        match Self::from_args(args) {
            Ok(conf) => conf,
            Err(e) => {
                error!(path = %path, error = %e, "cannot read kafka properties file");
                std::process::exit(1);
            }
        }
    }

    pub fn from_args(args: Args) -> std::io::Result<Self> {
        let properties = load_properties(&args.kafka_properties)?;
        Ok(LaunchConfig {
            consumers: args.consumers_num.get(),
            topics: args.topics.into(),
            properties,
        })
    }
}

/// Reads a `key=value` properties file. Blank lines and `#`/`!` comments
/// are skipped; whitespace around keys and values is trimmed. A line with
/// no separator becomes a key with an empty value.
pub fn load_properties(path: &Path) -> std::io::Result<Vec<(String, String)>> {
    let text = fs::read_to_string(path)?;

    let mut pairs = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => pairs.push((key.trim().to_string(), value.trim().to_string())),
            None => pairs.push((line.to_string(), String::new())),
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(argv)
    }

    #[test]
    fn parses_full_command_line() {
        let args = parse(&[
            "kafka-consumer-pool",
            "-c",
            "3",
            "-t",
            "orders",
            "payments",
            "-k",
            "/etc/kafka.properties",
        ])
        .unwrap();

        assert_eq!(args.consumers_num.get(), 3);
        assert_eq!(args.topics, vec!["orders", "payments"]);
        assert_eq!(args.kafka_properties, PathBuf::from("/etc/kafka.properties"));
    }

    #[test]
    fn rejects_missing_arguments() {
        assert!(parse(&["kafka-consumer-pool", "-c", "2", "-t", "orders"]).is_err());
        assert!(parse(&["kafka-consumer-pool", "-t", "orders", "-k", "x"]).is_err());
        assert!(parse(&["kafka-consumer-pool", "-c", "2", "-k", "x"]).is_err());
    }

    #[test]
    fn rejects_zero_consumers() {
        assert!(parse(&["kafka-consumer-pool", "-c", "0", "-t", "orders", "-k", "x"]).is_err());
    }

    #[test]
    fn loads_properties_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# consumer settings").unwrap();
        writeln!(file, "bootstrap.servers = localhost:9092").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "! legacy comment").unwrap();
        writeln!(file, "group.id=pool").unwrap();
        writeln!(file, "enable.partition.eof").unwrap();

        let pairs = load_properties(file.path()).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("bootstrap.servers".to_string(), "localhost:9092".to_string()),
                ("group.id".to_string(), "pool".to_string()),
                ("enable.partition.eof".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn unreadable_properties_file_fails_before_launch() {
        let args = parse(&[
            "kafka-consumer-pool",
            "-c",
            "1",
            "-t",
            "orders",
            "-k",
            "/no/such/file.properties",
        ])
        .unwrap();

        assert!(LaunchConfig::from_args(args).is_err());
    }
}
