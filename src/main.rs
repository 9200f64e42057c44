// What this tool does:
// • `track` (default): watches the game window, finds the colored name tag,
//   the UI border paired with it and the "behind cover" silhouette, and logs
//   where each sits relative to the screen center. --debug shows an overlay
//   window (M: mask view, Q/ESC: quit).
// • `look`: turns the in-game view to an absolute pitch/yaw (degrees).
// • `reset-view`: levels the pitch by pinning it against the top clamp.
// • `cursor`: prints the pointer position until Ctrl-C.
// • `hold`: holds one key for a while.

mod capture;
mod config;
mod draw;
mod error;
mod input;
mod regions;
mod session;
mod tracking;
mod types;
mod view;
mod vision;

use clap::{Parser, Subcommand};
use config::Config;
use draw::Drawer;
use error::Error;
use input::{KeyCode, OsInput};
use log::{debug, info, LevelFilter};
use session::{InterruptFlag, Session, StopSignal};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use view::ViewController;

#[derive(Parser, Debug)]
#[command(name = "tagsight", version, about = "Color-keyed feature tracking and view control for a game window")]
struct Cli {
    /// JSON file overriding the built-in constants
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log per-frame details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// In-game mouse sensitivity (overrides config)
    #[arg(long, global = true)]
    sensitivity: Option<f64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the detection loop
    Track {
        /// Show the overlay window
        #[arg(long)]
        debug: bool,
        /// Window title to capture (overrides config)
        #[arg(long)]
        title: Option<String>,
        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,
    },
    /// Turn the view to an absolute pitch/yaw after leveling it
    Look {
        /// -90 (down) to +90 (up)
        #[arg(long, allow_hyphen_values = true)]
        pitch: f64,
        /// -180 (right) to +180 (left)
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        yaw: f64,
    },
    /// Level the pitch
    ResetView,
    /// Print the pointer position every 100 ms
    Cursor,
    /// Hold a key (a-z, 0-9, space, shift, ctrl, alt)
    Hold {
        #[arg(long)]
        key: String,
        #[arg(long, default_value_t = 2000)]
        ms: u64,
    },
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command.unwrap_or(Command::Track { debug: false, title: None, max_frames: None }) {
        Command::Track { debug, title, max_frames } => {
            if let Some(title) = title {
                config.window.title = title;
            }
            track(&config, cli.sensitivity, debug, max_frames)
        }
        Command::Look { pitch, yaw } => {
            let mut stop = InterruptFlag::install()?;
            if !session::countdown(config.window.countdown_secs, &mut stop) {
                return Ok(());
            }
            let mut view = make_view(&config, cli.sensitivity)?;
            if !session::level_view(&mut view, &mut stop)? {
                return Ok(());
            }
            view.set_pitch(pitch)?;
            view.set_yaw(yaw)?;
            info!("view now at {:?}", view.state());
            Ok(())
        }
        Command::ResetView => {
            let mut stop = InterruptFlag::install()?;
            if session::countdown(config.window.countdown_secs, &mut stop) {
                session::level_view(&mut make_view(&config, cli.sensitivity)?, &mut stop)?;
            }
            Ok(())
        }
        Command::Cursor => {
            let input = OsInput::new()?;
            let mut stop = InterruptFlag::install()?;
            while !stop.stop_requested() {
                let (x, y) = input.cursor_position()?;
                println!("{x} {y}");
                thread::sleep(Duration::from_millis(100));
            }
            Ok(())
        }
        Command::Hold { key, ms } => {
            let key: KeyCode = key.parse()?;
            let mut stop = InterruptFlag::install()?;
            if !session::countdown(config.window.countdown_secs, &mut stop) {
                return Ok(());
            }
            input::hold_key(&mut OsInput::new()?, key, Duration::from_millis(ms))
        }
    }
}

fn track(config: &Config, sensitivity: Option<f64>, debug: bool, max_frames: Option<u64>) -> Result<(), Error> {
    let mut stop = InterruptFlag::install()?;
    if !session::countdown(config.window.countdown_secs, &mut stop) {
        return Ok(());
    }

    /* 1) Find the game (or the desktop) and level the view */
    let (acquired, fallback) = session::acquire(config)?;
    if !session::level_view(&mut make_view(config, sensitivity)?, &mut stop)? {
        return Ok(());
    }

    /* 2) Optional overlay window, sized to the capture region */
    let mut drawer = if debug {
        let r = acquired.region;
        Some(Drawer::new("tagsight debug", r.width as usize, r.height as usize)?)
    } else {
        None
    };

    /* 3) Loop; here the consumer just reports where the target is */
    let mut session = Session::new(config, acquired, fallback);
    let mut had_target = false;
    let summary = session.run(&mut stop, drawer.as_mut(), max_frames, |report| {
        match report.aim {
            Some(aim) => {
                let paired = if report.secondary.detection.found { "paired UI" } else { "no UI" };
                let line = format!("target at ({}, {}) from center, {paired}", aim.dx, aim.dy);
                if had_target { debug!("{line}") } else { info!("{line}") }
                had_target = true;
            }
            None if had_target => {
                info!("target lost");
                had_target = false;
            }
            None => {}
        }
    })?;

    info!(
        "exiting after {} frames{}; last known: {:?}",
        summary.frames,
        if summary.fell_back { " (desktop fallback)" } else { "" },
        summary.last_known
    );
    Ok(())
}

fn make_view(config: &Config, sensitivity: Option<f64>) -> Result<ViewController<OsInput>, Error> {
    let mut view = ViewController::new(OsInput::new()?, &config.view);
    if let Some(s) = sensitivity {
        view.set_sensitivity(s)?;
    }
    Ok(view)
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_track() {
        let cli = Cli::try_parse_from(["tagsight"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn look_accepts_negative_angles() {
        let cli = Cli::try_parse_from(["tagsight", "look", "--pitch", "-30", "--yaw", "-90.5"]).unwrap();
        match cli.command {
            Some(Command::Look { pitch, yaw }) => {
                assert_eq!(pitch, -30.0);
                assert_eq!(yaw, -90.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn track_flags_parse() {
        let cli = Cli::try_parse_from(["tagsight", "--verbose", "track", "--debug", "--max-frames", "5"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Command::Track { debug: true, max_frames: Some(5), .. })));
    }
}
