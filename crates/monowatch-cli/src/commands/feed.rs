//! Print a snapshot's event feed.

use std::path::Path;

use anyhow::{Context, Result};
use monowatch::load_snapshot;
use monowatch::reconcile::{ActionKind, GameEvent, SYSTEM_PLAYER};
use owo_colors::OwoColorize;

pub fn run(path: &Path) -> Result<()> {
    let snapshot =
        load_snapshot(path).with_context(|| format!("reading snapshot {}", path.display()))?;

    println!(
        "{} turn {}, {} to play",
        "Game".bold(),
        snapshot.global.turn,
        snapshot.global.current_player.as_deref().unwrap_or("?")
    );
    for player in &snapshot.players {
        println!("  {:<16} {:>6}", player.name, player.cash);
    }
    println!();

    if snapshot.events.is_empty() {
        println!("{}", "No events yet".dimmed());
    }
    for event in &snapshot.events {
        println!("{}", format_event(event));
    }
    Ok(())
}

fn format_event(event: &GameEvent) -> String {
    let when = event.timestamp.format("%H:%M:%S");
    let player = if event.player == SYSTEM_PLAYER {
        event.player.dimmed().to_string()
    } else {
        event.player.bold().to_string()
    };
    let message = match event.kind {
        ActionKind::PayRent | ActionKind::PayMoney | ActionKind::MoveAndPay => {
            event.message.red().to_string()
        }
        ActionKind::ReceiveMoney | ActionKind::BuyProperty | ActionKind::MoveAndBuy => {
            event.message.green().to_string()
        }
        ActionKind::JailEnter | ActionKind::JailExit => event.message.yellow().to_string(),
        _ => event.message.clone(),
    };
    format!("{} {:>3} {} {}", when.dimmed(), event.turn, player, message)
}
