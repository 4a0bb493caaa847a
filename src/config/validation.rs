use crate::config::types::{Config, ImporterConfig, OutputConfig, UserAgentConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

const MAX_COMMIT_WORKERS: u32 = 64;

/// Checks every section of a parsed configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_importer(&config.importer)?;
    validate_user_agent(&config.user_agent)?;
    validate_output(&config.output)
}

fn check(condition: bool, message: impl FnOnce() -> String) -> ConfigResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Validation(message()))
    }
}

fn validate_importer(importer: &ImporterConfig) -> ConfigResult<()> {
    check(
        (1..=MAX_COMMIT_WORKERS).contains(&importer.max_commit_workers),
        || {
            format!(
                "max-commit-workers must be between 1 and {}, got {}",
                MAX_COMMIT_WORKERS, importer.max_commit_workers
            )
        },
    )?;
    check(importer.request_timeout_secs > 0, || {
        "request-timeout-secs must be greater than zero".to_string()
    })
}

fn validate_user_agent(agent: &UserAgentConfig) -> ConfigResult<()> {
    check(!agent.crawler_name.is_empty(), || {
        "crawler-name cannot be empty".to_string()
    })?;
    // The name becomes the product token of the User-Agent header
    check(
        agent
            .crawler_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        || format!("crawler-name '{}' is not a valid product token", agent.crawler_name),
    )?;
    check(!agent.crawler_version.trim().is_empty(), || {
        "crawler-version cannot be empty".to_string()
    })?;

    Url::parse(&agent.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("contact-url: {}", e)))?;

    check(is_plausible_email(&agent.contact_email), || {
        format!("contact-email '{}' is not an email address", agent.contact_email)
    })
}

fn validate_output(output: &OutputConfig) -> ConfigResult<()> {
    check(!output.database_path.trim().is_empty(), || {
        "database-path cannot be empty".to_string()
    })?;
    check(!output.summary_path.trim().is_empty(), || {
        "summary-path cannot be empty".to_string()
    })
}

/// `local@domain.tld` with exactly one `@`
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}
