use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::ArgGroup;
use clap::Parser;
use unitd::ControlClient;
use unitd::UnitId;

/// Operator front end for the unit registry service.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("action").required(true).multiple(false)))]
struct Cli {
    /// Control channel address of the running service
    #[arg(long, default_value = "127.0.0.1:9470")]
    endpoint: SocketAddr,

    /// Upper bound on each request/response round trip
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,

    /// Attach a new unit and print its id
    #[arg(short = 'a', long, group = "action")]
    attach: bool,

    /// Detach the given unit
    #[arg(short = 'd', long, value_name = "UNIT", group = "action")]
    detach: Option<UnitId>,

    /// Check that the given unit is attached
    #[arg(short = 'q', long, value_name = "UNIT", group = "action")]
    query: Option<UnitId>,

    /// List attached units, most recent first
    #[arg(short = 'l', long, group = "action")]
    list: bool,

    /// Ask the service to drain and stop
    #[arg(short = 's', long, group = "action")]
    shutdown: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Attach,
    Detach(UnitId),
    Query(UnitId),
    List,
    Shutdown,
}

impl Cli {
    fn action(&self) -> Action {
        match (self.detach, self.query) {
            (Some(unit), _) => Action::Detach(unit),
            (_, Some(unit)) => Action::Query(unit),
            _ if self.attach => Action::Attach,
            _ if self.list => Action::List,
            _ => Action::Shutdown,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut client = ControlClient::connect(cli.endpoint, Duration::from_millis(cli.timeout_ms))
        .await
        .with_context(|| format!("connect to {}", cli.endpoint))?;

    match cli.action() {
        Action::Attach => {
            let unit = client.attach().await.context("attach")?;
            println!("unit: {unit}");
        }
        Action::Detach(unit) => client
            .detach(unit)
            .await
            .with_context(|| format!("detach unit {unit}"))?,
        Action::Query(unit) => client
            .query(unit)
            .await
            .with_context(|| format!("query unit {unit}"))?,
        Action::List => {
            let units = client.list().await.context("list")?;
            print!("{}", render_list(&units));
        }
        Action::Shutdown => client.shutdown().await.context("shutdown")?,
    }

    Ok(())
}

fn render_list(units: &[UnitId]) -> String {
    let mut out = String::from(" UNIT\n");
    for unit in units {
        out.push_str(&format!(" {unit}\n"));
    }
    out
}
