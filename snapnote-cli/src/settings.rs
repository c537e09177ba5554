//! `settings` command

use crate::cli::SettingsCommands;
use crate::context::CliContext;
use crate::display;
use crate::error::{CliError, CliResult};
use serde_json::Map;
use snapnote::{Settings, SettingsPatch};

pub async fn handle_settings_command(
    command: SettingsCommands,
    context: &CliContext,
) -> CliResult<()> {
    match command {
        SettingsCommands::Show { format } => {
            let mut response = context.execute("getSettings", Map::new()).await?;
            let settings: Settings = response.take("settings")?;
            display::print_settings(&settings, format)
        }
        SettingsCommands::Set {
            dark_mode,
            auto_backup,
            max_notes,
            notifications,
        } => {
            let patch = SettingsPatch {
                dark_mode,
                auto_backup,
                max_notes,
                notifications,
            };
            if patch.is_empty() {
                return Err(CliError::rejected(
                    "Nothing to change; pass at least one setting",
                ));
            }

            let args =
                CliContext::create_arguments(vec![("settings", Some(serde_json::to_value(&patch)?))]);
            let mut response = context.execute("updateSettings", args).await?;
            let settings: Settings = response.take("settings")?;

            println!("{}", display::success("Settings updated"));
            display::print_settings(&settings, Default::default())
        }
    }
}
