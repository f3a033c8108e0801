use anyhow::{Context, Result};
use readmap_etl::{config, Config};

const VALID_KEYS: &str =
    "google_api_key, database_path, embedding_model, api_base, request_timeout_secs";

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    let config_path = config::config_file_path();
    println!("Config file: {}", config_path.display());
    println!(
        "File exists: {}\n",
        if config_path.exists() { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    println!("  google_api_key: {}", config.masked_api_key());
    println!("  database_path: {}", config.database_path.display());
    println!("  embedding_model: {}", config.embedding_model);
    println!("  api_base: {}", config.api_base);
    println!("  request_timeout_secs: {}", config.request_timeout_secs);

    println!("\nPriority: CLI args > ENV vars (READMAP_*, GOOGLE_API_KEY) > Config file > Defaults");

    Ok(())
}

/// Print a single config value.
pub fn get_config(key: &str) -> Result<()> {
    let config = Config::load()?;

    let value = match key {
        "google_api_key" => config.masked_api_key(),
        "database_path" => config.database_path.display().to_string(),
        "embedding_model" => config.embedding_model,
        "api_base" => config.api_base,
        "request_timeout_secs" => config.request_timeout_secs.to_string(),
        _ => anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, VALID_KEYS),
    };

    println!("{}", value);
    Ok(())
}

/// Set a value in the config file.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let item = match key {
        "google_api_key" | "database_path" | "embedding_model" | "api_base" => {
            toml_edit::value(value)
        }
        "request_timeout_secs" => {
            let secs: i64 = value.parse().ok().filter(|secs| *secs >= 0).with_context(|| {
                format!("request_timeout_secs must be a whole number, got {value:?}")
            })?;
            toml_edit::value(secs)
        }
        _ => anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, VALID_KEYS),
    };

    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = set_setting(&contents, key, item)?;
    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {}", key);
    println!("  in {}", config_path.display());

    Ok(())
}

/// Set `key` in the top-level table, keeping comments and layout intact.
fn set_setting(contents: &str, key: &str, item: toml_edit::Item) -> Result<String> {
    let mut doc: toml_edit::DocumentMut =
        contents.parse().context("Config file is not valid TOML")?;
    doc[key] = item;
    Ok(doc.to_string())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to set your Google API key.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(contents: &str) -> toml_edit::DocumentMut {
        contents.parse().unwrap()
    }

    #[test]
    fn test_set_existing_setting_keeps_comments() {
        let contents = "# comment\ngoogle_api_key = \"old\"\n#api_base = \"x\"\n";
        let updated = set_setting(contents, "google_api_key", toml_edit::value("new")).unwrap();
        assert!(updated.contains("# comment"));
        assert!(updated.contains("#api_base = \"x\""));
        assert_eq!(parsed(&updated)["google_api_key"].as_str(), Some("new"));
    }

    #[test]
    fn test_set_commented_setting_adds_it() {
        let contents = "#embedding_model = \"a\"\n";
        let updated = set_setting(contents, "embedding_model", toml_edit::value("b")).unwrap();
        assert!(updated.contains("#embedding_model = \"a\""));
        assert_eq!(parsed(&updated)["embedding_model"].as_str(), Some("b"));
    }

    #[test]
    fn test_set_value_with_backslash_and_quote_stays_valid() {
        let path = r#"C:\data\my "books"\r.db"#;
        let updated = set_setting("", "database_path", toml_edit::value(path)).unwrap();
        assert_eq!(parsed(&updated)["database_path"].as_str(), Some(path));
    }

    #[test]
    fn test_set_integer_setting() {
        let updated = set_setting(
            "request_timeout_secs = 30\n",
            "request_timeout_secs",
            toml_edit::value(5_i64),
        )
        .unwrap();
        assert_eq!(parsed(&updated)["request_timeout_secs"].as_integer(), Some(5));
    }

    #[test]
    fn test_set_setting_rejects_invalid_file() {
        let contents = "google_api_key = \"unterminated\n";
        assert!(set_setting(contents, "api_base", toml_edit::value("x")).is_err());
    }
}
