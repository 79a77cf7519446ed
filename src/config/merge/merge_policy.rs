//! Merge rules: built-in defaults below every file and environment layer.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Name of the invoking user, used for the default work and scratch bases
pub fn current_user() -> Option<String> {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.is_empty())
}

/// Create a Config builder with the built-in job defaults applied.
///
/// Work and scratch bases default to `/scratch/<user>` and
/// `/lscratch/<user>` only when a user name is known.
pub fn builder_with_defaults(user: Option<&str>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = Config::builder()
        .set_default("job.merge_stdout_stderr", "true")?
        .set_default("job.send_email_end", "true")?
        .set_default("job.send_email_error", "true")?;

    if let Some(user) = user {
        builder = builder
            .set_default("job.workdir_base", format!("/scratch/{}", user))?
            .set_default("job.scratchdir_base", format!("/lscratch/{}", user))?;
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SendscriptConfig;

    #[test]
    fn test_defaults_with_user() {
        let config: SendscriptConfig = builder_with_defaults(Some("bob"))
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.job.workdir_base, "/scratch/bob");
        assert_eq!(config.job.scratchdir_base, "/lscratch/bob");
        assert_eq!(config.job.merge_stdout_stderr, "true");
        assert_eq!(config.job.send_email_begin, "");
    }

    #[test]
    fn test_defaults_without_user() {
        let config: SendscriptConfig = builder_with_defaults(None)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(config.job.workdir_base.is_empty());
        assert_eq!(config.job.send_email_error, "true");
    }
}
