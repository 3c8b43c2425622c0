use std::error::Error;

use clap::Subcommand;
use focusdesk_core::{Settings, ValidationError};

use super::timer::{load_controller, save_controller};
use super::{print_json, Context};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the current user's timer settings
    Show,
    /// Change one setting (e.g. pomodoro_length 50)
    Set { key: String, value: String },
}

fn apply(settings: &mut Settings, key: &str, value: &str) -> Result<(), ValidationError> {
    let invalid = |message: String| ValidationError::InvalidValue {
        field: key.to_string(),
        message,
    };
    let minutes = || {
        value
            .parse::<u32>()
            .map_err(|e| invalid(format!("'{value}': {e}")))
    };
    let flag = || {
        value
            .parse::<bool>()
            .map_err(|e| invalid(format!("'{value}': {e}")))
    };

    match key {
        "pomodoro_length" => settings.pomodoro_length = minutes()?,
        "short_break_length" => settings.short_break_length = minutes()?,
        "long_break_length" => settings.long_break_length = minutes()?,
        "long_break_interval" => settings.long_break_interval = minutes()?,
        "auto_start_breaks" => settings.auto_start_breaks = flag()?,
        "auto_start_pomodoros" => settings.auto_start_pomodoros = flag()?,
        _ => return Err(invalid("unknown setting".into())),
    }
    Ok(())
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn Error>> {
    let ctx = Context::open()?;
    ctx.user_id()?;
    let (mut ctrl, _) = load_controller(ctx)?;

    match action {
        SettingsAction::Show => {
            print_json(ctrl.settings())?;
        }
        SettingsAction::Set { key, value } => {
            let mut settings = ctrl.settings().clone();
            apply(&mut settings, &key, &value)?;
            ctrl.update_settings(settings)?;
            print_json(ctrl.settings())?;
        }
    }

    save_controller(&ctrl)?;
    Ok(())
}
