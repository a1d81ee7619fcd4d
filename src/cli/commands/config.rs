//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{set_value_in_file, Config, ConfigManager, LOCAL_CONFIG_NAME, VALID_KEYS};
use crate::error::{DepvaultError, DepvaultResult};
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> DepvaultResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            set_value(manager, &key, &value, local).await?
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> DepvaultResult<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> DepvaultResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    key: &str,
    value: &str,
    local: bool,
) -> DepvaultResult<()> {
    let ctx = UiContext::detect();

    let result = if local {
        let cwd = std::env::current_dir()
            .map_err(|e| DepvaultError::io("getting current directory", e))?;
        let path = cwd.join(LOCAL_CONFIG_NAME);
        set_value_in_file(&path, key, value).await.map(|()| path)
    } else {
        manager
            .set_value(key, value)
            .await
            .map(|()| manager.path().to_path_buf())
    };

    match result {
        Ok(path) => {
            ui::step_ok(
                &ctx,
                &format!("Set {} = {} in {}", key, value, path.display()),
            );
            Ok(())
        }
        Err(e @ DepvaultError::User(_)) if !VALID_KEYS.contains(&key) => {
            ui::remark(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
            Err(e)
        }
        Err(e) => Err(e),
    }
}
