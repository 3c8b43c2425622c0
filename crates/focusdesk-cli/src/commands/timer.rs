//! Timer commands.
//!
//! The controller state lives in the `kv` table between invocations, keyed
//! per user. Seconds that passed while no process was running are replayed
//! on load, so `status` after a while shows the right remaining time.

use std::error::Error;
use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use focusdesk_core::{Event, FocusController, FocusState, Phase, SqliteStore};
use serde_json::json;
use tracing::warn;

use super::{print_json, Context};

const STATE_KEY_PREFIX: &str = "focus_state";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown
    Start {
        /// Task to link to pomodoro sessions; only while no session is open
        #[arg(long)]
        task: Option<String>,
    },
    /// Pause the countdown
    Pause,
    /// Stop the countdown and discard its session
    Reset,
    /// Switch to another phase (pomodoro, short_break, long_break)
    Switch { phase: Phase },
    /// Print current timer state as JSON
    Status,
    /// Run the countdown in the foreground until it stops
    Run,
}

fn state_key(user_id: Option<&str>) -> String {
    format!("{STATE_KEY_PREFIX}:{}", user_id.unwrap_or("anonymous"))
}

/// Load the user's controller and replay the seconds missed since it was saved.
pub fn load_controller(
    ctx: Context,
) -> Result<(FocusController<SqliteStore>, Vec<Event>), Box<dyn Error>> {
    let user_id = ctx.config.user_id();
    let key = state_key(user_id.as_deref());

    let saved = match ctx.store.kv_get(&key)? {
        Some(json) => match serde_json::from_str::<FocusState>(&json) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "discarding unreadable timer state");
                None
            }
        },
        None => None,
    };

    match saved {
        Some(state) => {
            let saved_at = state.saved_at;
            let mut ctrl = FocusController::restore(ctx.store, user_id, state);
            let events = ctrl.catch_up(saved_at, Utc::now());
            Ok((ctrl, events))
        }
        None => {
            let ctrl = FocusController::load(ctx.store, user_id, ctx.config.timer.clone())?;
            Ok((ctrl, Vec::new()))
        }
    }
}

pub fn save_controller(ctrl: &FocusController<SqliteStore>) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string(&ctrl.save_state())?;
    ctrl.store().kv_set(&state_key(ctrl.user_id()), &json)?;
    Ok(())
}

fn print_outcome(
    ctrl: &FocusController<SqliteStore>,
    events: &[Event],
) -> Result<(), Box<dyn Error>> {
    print_json(&json!({
        "events": events,
        "state": ctrl.snapshot(),
    }))
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let ctx = Context::open()?;
    let (mut ctrl, mut events) = load_controller(ctx)?;

    match action {
        TimerAction::Start { task } => {
            if let Some(task_id) = task {
                ctrl.set_active_task(Some(&task_id))?;
            }
            events.extend(ctrl.start()?);
            print_outcome(&ctrl, &events)?;
        }
        TimerAction::Pause => {
            events.extend(ctrl.pause());
            print_outcome(&ctrl, &events)?;
        }
        TimerAction::Reset => {
            events.extend(ctrl.reset());
            print_outcome(&ctrl, &events)?;
        }
        TimerAction::Switch { phase } => {
            events.extend(ctrl.switch_phase(phase));
            print_outcome(&ctrl, &events)?;
        }
        TimerAction::Status => {
            print_outcome(&ctrl, &events)?;
        }
        TimerAction::Run => {
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
            run_foreground(&mut ctrl)?;
        }
    }

    save_controller(&ctrl)?;
    Ok(())
}

/// Drive the controller once per second, printing events as JSON lines.
/// Ctrl-C pauses and returns.
fn run_foreground(ctrl: &mut FocusController<SqliteStore>) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut events = ctrl.subscribe();

    runtime.block_on(async {
        if !ctrl.engine().is_running() {
            ctrl.start()?;
        }

        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            while let Ok(event) = events.try_recv() {
                println!("{}", serde_json::to_string(&event)?);
            }
            if !ctrl.engine().is_running() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    if !ctrl.tick().is_empty() {
                        save_controller(ctrl)?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    ctrl.pause();
                }
            }
        }
        Ok::<(), Box<dyn Error>>(())
    })
}
