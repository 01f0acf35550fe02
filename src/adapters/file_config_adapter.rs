//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// An adapter with no sections; every lookup falls back to defaults.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str) -> Option<Result<i64, String>> {
        self.get_string(section, key)
            .map(|raw| raw.parse::<i64>().map_err(|_| raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[store]
path = /var/lib/stockdata/Stock_Data.db
pool_size = 2

[yahoo]
base_url = http://localhost:8080/download
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("store", "path"),
            Some("/var/lib/stockdata/Stock_Data.db".to_string())
        );
        assert_eq!(adapter.get_int("store", "pool_size"), Some(Ok(2)));
        assert_eq!(
            adapter.get_string("yahoo", "base_url"),
            Some("http://localhost:8080/download".to_string())
        );
    }

    #[test]
    fn missing_keys_are_none() {
        let adapter = FileConfigAdapter::from_string("[store]\npath = a.db\n").unwrap();
        assert_eq!(adapter.get_string("store", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("store", "pool_size"), None);
    }

    #[test]
    fn blank_value_is_treated_as_missing() {
        let adapter = FileConfigAdapter::from_string("[yahoo]\nuser_agent =\n").unwrap();
        assert_eq!(adapter.get_string("yahoo", "user_agent"), None);
    }

    #[test]
    fn non_numeric_int_returns_raw_value() {
        let adapter = FileConfigAdapter::from_string("[store]\npool_size = many\n").unwrap();
        assert_eq!(
            adapter.get_int("store", "pool_size"),
            Some(Err("many".to_string()))
        );
    }

    #[test]
    fn empty_adapter_has_nothing() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("store", "path"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[output]\nchart_dir = /tmp/charts\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("output", "chart_dir"),
            Some("/tmp/charts".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
