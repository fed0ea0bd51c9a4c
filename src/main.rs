// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! rampscope: console exerciser for the Rampdesk stand assignment client.
//!
//! Simulates the radar display around `ramp-client`: a mutable traffic
//! picture, a 1 Hz scheduler, and stdout as the message area. Useful for
//! poking at a Rampdesk server without a running radar session.

mod config;
mod console;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::debug;
use ramp_client::{
    AircraftInfo, ApiConfig, ClientConfig, Highlight, RadarHost, RampClient, StandCatalog,
    StandStatus, TagEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use console::ConsoleHost;

#[derive(Debug, Parser)]
#[command(
    name = "rampscope",
    version,
    about = "Console exerciser for the Rampdesk stand assignment client"
)]
struct Args {
    /// Rampdesk server domain, without a scheme
    #[arg(long)]
    server: Option<String>,

    /// Controller callsign to connect as on startup
    #[arg(long)]
    callsign: Option<String>,

    /// Connect as an observer (tags still sync, assignment is disabled)
    #[arg(long)]
    observer: bool,

    /// Seconds between occupancy polls (0 disables polling)
    #[arg(long)]
    poll_every: Option<u64>,

    /// Offer assignment only for destinations starting with this ICAO prefix
    #[arg(long)]
    airport_filter: Option<String>,

    /// Initial traffic picture, e.g. "AFR123@LFPG,BAW22@EGLL/A320"
    #[arg(long)]
    traffic: Option<String>,

    /// Write the merged configuration to disk and exit
    #[arg(long)]
    save_config: bool,
}

const HELP: &str = "\
Commands:
  traffic [SPEC,...]      show or replace the visible traffic
                          (SPEC is CALLSIGN@DEST or CALLSIGN@DEST/TYPE)
  menu CALLSIGN           open the stand menu for an aircraft
  assign CALLSIGN STAND   request a stand
  free CALLSIGN           free the aircraft's stand
  tags                    print the published tags
  status                  print session and snapshot state
  connect CALLSIGN [obs]  start a session (obs = observer)
  .ramp ...               scope commands (version | url <domain> | disconnect)
  help                    show this text
  quit                    exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    let mut app = config::AppConfig::load();
    if let Some(server) = args.server {
        app.server_domain = server;
    }
    if let Some(callsign) = args.callsign {
        app.callsign = callsign;
    }
    if args.observer {
        app.observer = true;
    }
    if let Some(poll_every) = args.poll_every {
        app.poll_every_secs = poll_every;
    }
    if let Some(filter) = args.airport_filter {
        app.airport_filter = filter;
    }

    if args.save_config {
        app.save()?;
        match config::AppConfig::get_config_path() {
            Ok(path) => println!("Saved configuration to {}", path.display()),
            Err(_) => println!("Saved configuration."),
        }
        return Ok(());
    }

    let traffic = args
        .traffic
        .as_deref()
        .map(parse_traffic_list)
        .unwrap_or_default();
    let host = Arc::new(ConsoleHost::new(traffic));

    let client = RampClient::spawn(
        ClientConfig {
            api: ApiConfig {
                domain: app.server_domain.clone(),
                ..ApiConfig::default()
            },
            poll_every_ticks: app.poll_every_secs,
            tick_interval: Duration::from_secs(1),
            drive_ticks: true,
            airport_filter: (!app.airport_filter.is_empty()).then(|| app.airport_filter.clone()),
            ..ClientConfig::default()
        },
        Arc::<ConsoleHost>::clone(&host),
    );

    if app.callsign.is_empty() {
        println!("Not connected; use `connect CALLSIGN` to start a session.");
    } else {
        client.connect(&app.callsign, !app.observer);
    }

    let mut events = client.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_tag_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Tag event printer lagged by {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_command(&client, &host, &line) {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("stdin error: {e}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    printer.abort();
    client.shutdown().await;
    Ok(())
}

/// Run one console command. Returns `false` when the user asked to exit.
fn handle_command(client: &RampClient, host: &ConsoleHost, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }
    if line.starts_with('.') {
        if !client.on_scope_command(line) {
            println!("Unknown scope command. {}", ramp_client::USAGE);
        }
        return true;
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    match command.as_str() {
        "help" => println!("{HELP}"),
        "quit" | "exit" => return false,
        "traffic" => {
            let rest = line
                .split_once(char::is_whitespace)
                .map(|(_, rest)| rest.trim())
                .unwrap_or_default();
            if rest.is_empty() {
                list_traffic(host);
            } else {
                let traffic = parse_traffic_list(rest);
                println!("Visible traffic set to {} aircraft.", traffic.len());
                host.set_traffic(traffic);
            }
        }
        "menu" => {
            let Some(callsign) = words.next() else {
                println!("Usage: menu CALLSIGN");
                return true;
            };
            match host.find(callsign) {
                Some(aircraft) => match client.open_assign_menu(&aircraft) {
                    Some(catalog) => print_catalog(&catalog),
                    None => println!("Assignment menu unavailable for {}.", aircraft.callsign),
                },
                None => println!("{} is not visible.", callsign.to_ascii_uppercase()),
            }
        }
        "assign" => {
            let (Some(callsign), Some(stand)) = (words.next(), words.next()) else {
                println!("Usage: assign CALLSIGN STAND");
                return true;
            };
            match host.find(callsign) {
                Some(aircraft) => client.assign_stand(&aircraft, Some(stand)),
                None => println!("{} is not visible.", callsign.to_ascii_uppercase()),
            }
        }
        "free" => {
            let Some(callsign) = words.next() else {
                println!("Usage: free CALLSIGN");
                return true;
            };
            match host.find(callsign) {
                Some(aircraft) => client.assign_stand(&aircraft, None),
                None => println!("{} is not visible.", callsign.to_ascii_uppercase()),
            }
        }
        "tags" => print!("{}", console::render_tags(&client.published_tags())),
        "status" => print_status(client),
        "connect" => {
            let Some(callsign) = words.next() else {
                println!("Usage: connect CALLSIGN [obs]");
                return true;
            };
            let observer = words.next().is_some_and(|w| w.eq_ignore_ascii_case("obs"));
            client.connect(callsign, !observer);
            println!(
                "Connected as {}{}.",
                callsign.trim().to_ascii_uppercase(),
                if observer { " (observer)" } else { "" }
            );
        }
        _ => println!("Unknown command; try `help`."),
    }
    true
}

fn parse_traffic_list(list: &str) -> Vec<AircraftInfo> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(console::parse_traffic_spec)
        .collect()
}

fn list_traffic(host: &ConsoleHost) {
    let visible = host.visible_aircraft();
    if visible.is_empty() {
        println!("No visible traffic.");
        return;
    }
    for aircraft in visible {
        println!(
            "{} -> {}{}",
            aircraft.callsign,
            aircraft.destination.as_deref().unwrap_or("????"),
            aircraft
                .aircraft_type
                .as_deref()
                .map(|t| format!(" ({t})"))
                .unwrap_or_default()
        );
    }
}

fn print_status(client: &RampClient) {
    println!(
        "Session: {}",
        if client.is_connected() {
            "connected"
        } else {
            "not connected"
        }
    );
    println!("Server:  {}", client.server_domain());

    let cached = client.latest_snapshot();
    match cached.fetched_at {
        Some(at) => println!("Snapshot fetched at {}", at.format("%H:%M:%SZ")),
        None => println!("Snapshot never fetched"),
    }
    match serde_json::to_string_pretty(&cached.snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("Could not render the snapshot: {e}"),
    }
}

fn print_catalog(catalog: &StandCatalog) {
    if catalog.is_empty() {
        println!(
            "No stands cached for {} yet; fetching. Reopen the menu in a moment.",
            catalog.icao
        );
        return;
    }
    println!("Stands at {}:", catalog.icao);
    for entry in &catalog.entries {
        let marker = match entry.status {
            StandStatus::Available => ' ',
            StandStatus::Assigned => 'A',
            StandStatus::Occupied => 'O',
            StandStatus::Blocked => 'B',
        };
        println!("  [{}] {}", marker, entry.name);
    }
}

fn print_tag_event(event: &TagEvent) {
    match event {
        TagEvent::Updated { callsign, state } => {
            let stand = if state.stand.is_empty() {
                "(none)"
            } else {
                state.stand.as_str()
            };
            let flash = match state.highlight {
                Highlight::Changed => " *",
                Highlight::Unchanged => "",
            };
            let remark = if state.remark.is_empty() {
                String::new()
            } else {
                format!("  [{}]", state.remark)
            };
            println!("TAG {callsign}: {stand}{flash}{remark}");
        }
        TagEvent::Cleared { callsign } => println!("TAG {callsign}: cleared"),
    }
}
