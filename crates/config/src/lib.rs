//! Configuration loading and env substitution for skilldeck.
//!
//! Config files: `skilldeck.toml`, `skilldeck.yaml`/`.yml`, or `skilldeck.json`,
//! searched in `./` then the user config dir (`~/.config/skilldeck/` on Linux).
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        CONFIG_FILENAMES, ENV_PLUGINS_FALLBACK, ENV_USER_DIR, LoadedConfig, apply_env_overrides,
        config_dir, discover_and_load, find_config_file, load_config,
    },
    schema::{LoggingConfig, SkilldeckConfig, SkillsConfig},
};
