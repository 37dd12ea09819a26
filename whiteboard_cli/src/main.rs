use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use spinners::{Spinner, Spinners};
use whiteboard_relay::{DrawingEvent, Message, RelayClient};

/// A headless client for a shared whiteboard relay.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host running the relay.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port the relay listens on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the drawing history the relay replays to newcomers.
    History,
    /// Stream every drawing event as it is relayed.
    Watch,
    /// Draw a single line segment.
    /// Example: whiteboard line 0,0 10,10 --color red --width 3
    Line {
        /// Start point as x,y
        #[arg(value_parser = parse_point)]
        start: (i32, i32),
        /// End point as x,y
        #[arg(value_parser = parse_point)]
        end: (i32, i32),
        #[arg(long, default_value = "black")]
        color: String,
        #[arg(long, default_value_t = 2)]
        width: i32,
    },
    /// Wipe the shared canvas for everyone.
    Clear,
}

// Parses "x,y" into a point.
fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {s:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    Ok((x, y))
}

fn describe(event: &DrawingEvent) -> String {
    match event {
        DrawingEvent::Line(stroke) => format!(
            "line ({}, {}) -> ({}, {}) {} w{}",
            stroke.start.0, stroke.start.1, stroke.end.0, stroke.end.1, stroke.color, stroke.width
        ),
        DrawingEvent::Clear => "clear".to_string(),
    }
}

fn history_table(events: &[DrawingEvent]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Action", "Start", "End", "Color", "Width"]);
    for (i, event) in events.iter().enumerate() {
        match event {
            DrawingEvent::Line(stroke) => table.add_row(vec![
                i.to_string(),
                "line".to_string(),
                format!("{:?}", stroke.start),
                format!("{:?}", stroke.end),
                stroke.color.clone(),
                stroke.width.to_string(),
            ]),
            DrawingEvent::Clear => table.add_row(vec![i.to_string(), "clear".to_string()]),
        };
    }
    table
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    let mut sp = Spinner::new(Spinners::Dots9, format!("Connecting to {addr}..."));
    let mut client = match RelayClient::connect(addr.as_str()).await {
        Ok(client) => {
            sp.stop_with_message("✓ Connected.".into());
            client
        }
        Err(e) => {
            sp.stop_with_message(format!("✗ Error: Could not connect to the relay: {e}"));
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::History => {
            if client.history().is_empty() {
                println!("The canvas is empty.");
            } else {
                println!("{}", history_table(client.history()));
            }
        }
        Commands::Watch => {
            println!("Replayed {} events, watching for more...", client.history().len());
            loop {
                match client.recv().await? {
                    Some(Message::Drawing(event)) => println!("{}", describe(&event)),
                    Some(Message::Init(events)) => {
                        println!("(relay replayed {} events again)", events.len())
                    }
                    None => {
                        eprintln!("Disconnected from the relay.");
                        break;
                    }
                }
            }
        }
        Commands::Line {
            start,
            end,
            color,
            width,
        } => {
            let event = DrawingEvent::line(start, end, color, width);
            let summary = describe(&event);
            client.send(event).await?;
            println!("✓ Sent {summary}");
        }
        Commands::Clear => {
            client.send(DrawingEvent::Clear).await?;
            println!("✓ Canvas cleared.");
        }
    }

    Ok(())
}
