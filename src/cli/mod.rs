//! # bgpx CLI
//!
//! Drives one BGP session through a backend control plane. The backend is
//! reached over a WebSocket (default `ws://127.0.0.1:8080/ws/`) or over
//! newline-delimited JSON on TCP (`tcp://host:port`), chosen by `endpoint`
//! in the config file.
//!
//! Validate a config without contacting the backend:
//! ```sh
//! $ bgpx check demos/config.toml
//!  Neighbor   AS     Local AS  Type  MD5  Add-Path  Full Table
//! ---------------------------------------------------------------
//!  192.0.2.1  65001  65000     eBGP  yes  true      false
//!
//!  Prefix             Next Hop       Origin      AS Path      Communities
//! ----------------------------------------------------------------------------
//!  198.51.100.0/24    192.0.2.254    IGP         65000        ---
//!  2001:db8:100::/48  2001:db8::254  INCOMPLETE  65000 65000  65000:100 65000:1:2
//! ```
//!
//! Create the session, announce the static routes and follow the feed:
//! ```sh
//! $ bgpx -v run demos/config.toml
//! ```

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use log::debug;

use crate::client::{Client, Notice};
use crate::config::{self, ClientConfig};
use crate::transport::{self, Transport};
use crate::utils::maybe_string;

mod display;
mod table;

use table::OutputTable;

#[derive(Parser, Debug)]
#[clap(name = "bgpx", rename_all = "kebab-case")]
/// BGP session controller client
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Show debug logs (additive for trace logs)
    #[clap(short, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Create the configured session and follow its route feed
    Run(ConfigOptions),
    /// Validate a config file and show what would be sent
    #[clap(alias = "c")]
    Check(ConfigOptions),
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct ConfigOptions {
    /// Path to bgpx config.toml
    pub config_path: String,
}

fn print_config(config: &ClientConfig) {
    OutputTable::from_rows(std::iter::once(&config.session)).print();
    println!();
    if config.announcements.is_empty() {
        println!("No static announcements");
    } else {
        OutputTable::from_rows(&config.announcements).print();
    }
}

fn print_notice<T: Transport>(client: &Client<T>, notice: &Notice) {
    match notice {
        Notice::Init(init) => {
            println!("Backend router-id {} listening on {}", init.router_id, init.listen_ip);
        }
        Notice::State { current, cleared, .. } => {
            let status = client.status();
            println!(
                "BGP state = {}, hold time is {}, keepalive interval is {}",
                current,
                maybe_string(status.hold_timer.as_ref()),
                maybe_string(status.keepalive_timer.as_ref()),
            );
            if *cleared > 0 {
                println!("Dropped {} received routes", cleared);
            }
        }
        // Already logged at debug level
        Notice::Log(_) => (),
        Notice::BackendError(message) => eprintln!("{}", message.red()),
        Notice::Routes(report) => {
            for collision in &report.collisions {
                eprintln!("{}", collision.to_string().yellow());
            }
            if report.is_empty() {
                return;
            }
            println!("Received routes ({})", client.received().len());
            OutputTable::from_rows(client.received().iter()).print();
            println!();
        }
    }
}

async fn run_session(config: ClientConfig) -> Result<(), Box<dyn Error>> {
    let (transport, inbound) = transport::connect(&config.endpoint).await?;
    let mut client = Client::new(Arc::new(transport));

    let session = &config.session;
    let id = client
        .create_session(session.peer_asn, &session.peer_ip.to_string(), session.local_asn)
        .await?;
    client
        .update_session(
            id,
            session.md5_password.as_deref(),
            session.add_path,
            session.full_table,
        )
        .await?;

    for announcement in config.announcements {
        let route = client.announce(announcement).await?;
        debug!("Static route {}", route);
    }
    if !client.announced().is_empty() {
        println!("Announced routes ({})", client.announced().len());
        OutputTable::from_rows(client.announced().iter()).print();
        println!();
    }

    client.run(inbound, print_notice).await;
    Ok(())
}

async fn run_cmd(args: &Args) -> Result<(), Box<dyn Error>> {
    match &args.cmd {
        Command::Check(options) => {
            let config = config::from_file(&options.config_path)?;
            debug!(
                "Found {} announcements in {}",
                config.announcements.len(),
                options.config_path
            );
            print_config(&config);
        }
        Command::Run(options) => {
            let config = config::from_file(&options.config_path)?;
            run_session(config).await?;
        }
    }
    Ok(())
}

/// Run a bgpx command, printing any error
pub async fn run(args: &Args) {
    if let Err(err) = run_cmd(args).await {
        eprintln!("{}", err.to_string().red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from(&["bgpx", "-vv", "check", "demos/config.toml"]);
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.cmd, Command::Check(ref o) if o.config_path == "demos/config.toml"));

        let args = Args::parse_from(&["bgpx", "run", "config.toml", "-v"]);
        assert_eq!(args.verbose, 1);
        assert!(matches!(args.cmd, Command::Run(_)));
    }
}
