use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dns_zone_server::config::ZoneFile;
use dns_zone_server::forwarder::{forward_query, ForwardOptions};
use dns_zone_server::server::DnsServer;
use dns_zone_server::{DnsQuestion, RecordClass, RecordType, ReservedBits};

#[derive(Parser, Debug)]
#[command(name = "dns-zone-server")]
#[command(about = "Authoritative DNS server for a single zone")]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer queries for a zone over UDP
    Serve {
        /// Zone file (TOML)
        #[arg(short, long)]
        zone: PathBuf,

        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:2053")]
        bind: SocketAddr,

        /// Drop requests with reserved header bits set
        #[arg(long)]
        strict_header: bool,
    },
    /// Send one query to a DNS server and print the reply
    Query {
        /// Upstream DNS server address (e.g., 8.8.8.8:53)
        #[arg(short, long)]
        server: SocketAddr,

        /// Name to look up
        name: String,

        /// Record type
        #[arg(default_value = "A")]
        rtype: RecordType,

        /// Give up after this many milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,

        /// Clear the recursion-desired bit
        #[arg(long)]
        no_recursion: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    match args.command {
        Command::Serve {
            zone,
            bind,
            strict_header,
        } => {
            let zone = ZoneFile::load(&zone)
                .with_context(|| format!("loading zone {}", zone.display()))?;
            let reserved = if strict_header {
                ReservedBits::Reject
            } else {
                ReservedBits::Ignore
            };

            let server = DnsServer::new(bind, Arc::new(zone), reserved)
                .with_context(|| format!("binding {}", bind))?;
            info!("dns-zone-server v{}", env!("CARGO_PKG_VERSION"));
            server.run().context("server loop failed")?;
        }
        Command::Query {
            server,
            name,
            rtype,
            timeout_ms,
            no_recursion,
        } => {
            let question = DnsQuestion::new(&name, rtype, RecordClass::IN);
            let options = ForwardOptions {
                timeout: Duration::from_millis(timeout_ms),
                recursion_desired: !no_recursion,
            };
            let response = forward_query(server, &question, options)
                .with_context(|| format!("querying {} for {}", server, question))?;

            println!(";; {} id={}", response.response_code(), response.id());
            for (section, records) in [
                ("ANSWER", response.answers()),
                ("AUTHORITY", response.authority()),
                ("ADDITIONAL", response.additional()),
            ] {
                if records.is_empty() {
                    continue;
                }
                println!(";; {}", section);
                for record in records {
                    println!("{}", record);
                }
            }
        }
    }

    Ok(())
}
