#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use cattetris::leaderboard::Leaderboard;
#[cfg(not(target_arch = "wasm32"))]
use cattetris::{GameHost, GameSettings, NullSink, RandomizerKind, RecordSink, SystemClock};
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

/// Plays seeded games with the built-in hint and reports how they went.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
struct Opts {
    /// Number of games to play
    #[arg(long, default_value_t = 10)]
    games: u32,
    /// Base seed; game N uses seed + N
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Name written into each finished record
    #[arg(long, default_value = "autoplayer")]
    player: String,
    /// Family the records are filed under
    #[arg(long, default_value = "demo")]
    family: String,
    /// Append finished records to this JSON-lines leaderboard
    #[arg(long)]
    leaderboard: Option<PathBuf>,
    /// Stop a game after this many placements
    #[arg(long, default_value_t = 10_000)]
    max_moves: u32,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let board = opts.leaderboard.as_ref().map(Leaderboard::open);
    let mut total_score = 0u64;

    for game in 0..opts.games {
        let settings = GameSettings {
            randomizer: RandomizerKind::Uniform {
                seed: Some(opts.seed.wrapping_add(game as u64)),
            },
            ..GameSettings::default()
        };
        let sink: Box<dyn RecordSink> = match &board {
            Some(b) => Box::new(b.sink(opts.family.clone())),
            None => Box::new(NullSink),
        };
        let mut host = GameHost::new(settings, opts.player.clone(), Box::new(SystemClock), sink)?;

        let mut moves = 0;
        while host.session().is_running() && moves < opts.max_moves {
            let Some(hint) = host.hint() else {
                break;
            };
            host.attempt_placement(hint.piece, hint.x, hint.y)?;
            moves += 1;
        }

        let stats = host.session().stats();
        total_score += stats.score as u64;
        println!(
            "game {:>3}: score {:>6} level {:>3} lines {:>5} pieces {:>5}{}",
            game + 1,
            stats.score,
            stats.level,
            stats.lines_cleared,
            stats.pieces_placed,
            if host.session().is_running() { " (move cap)" } else { "" }
        );
    }

    if opts.games > 0 {
        println!("average score {:.1}", total_score as f64 / opts.games as f64);
    }
    if let Some(b) = &board {
        if let Some(best) = b.best_for_family(&opts.family, 1)?.first() {
            println!(
                "family best: {} by {}",
                best.record.score, best.record.player_name
            );
        }
    }
    Ok(())
}
