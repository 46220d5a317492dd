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

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
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
[account]
id = default-user
initial_capital = 10000.0

[market]
source = http
cache_ttl_secs = 60

[autotrade]
symbols = RELIANCE,TCS,INFY
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("account", "id"),
            Some("default-user".to_string())
        );
        assert_eq!(
            adapter.get_string("autotrade", "symbols"),
            Some("RELIANCE,TCS,INFY".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[account]\nid = x\n").unwrap();
        assert_eq!(adapter.get_string("account", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[autotrade]\nmax_daily_trades = 10\n").unwrap();
        assert_eq!(adapter.get_int("autotrade", "max_daily_trades", 0), 10);
        assert_eq!(adapter.get_int("autotrade", "missing", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[autotrade]\nmax_daily_trades = many\n").unwrap();
        assert_eq!(adapter.get_int("autotrade", "max_daily_trades", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[account]\ninitial_capital = 10000.5\n").unwrap();
        assert_eq!(adapter.get_double("account", "initial_capital", 0.0), 10000.5);
        assert_eq!(adapter.get_double("account", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[account]\ninitial_capital = lots\n").unwrap();
        assert_eq!(adapter.get_double("account", "initial_capital", 99.9), 99.9);
    }

    #[test]
    fn get_bool_parses_common_forms() {
        let adapter =
            FileConfigAdapter::from_string("[web]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n")
                .unwrap();
        assert!(adapter.get_bool("web", "a", false));
        assert!(adapter.get_bool("web", "b", false));
        assert!(adapter.get_bool("web", "c", false));
        assert!(!adapter.get_bool("web", "d", true));
        assert!(!adapter.get_bool("web", "e", true));
        assert!(!adapter.get_bool("web", "f", true));
        assert!(adapter.get_bool("web", "missing", true));
    }

    #[test]
    fn from_file_reads_config() {
        let content = "[sqlite]\npath = /tmp/ledger.db\n";
        let file = create_temp_config(content);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("/tmp/ledger.db".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }

    #[test]
    fn handles_all_config_sections() {
        let content = r#"
[account]
id = default-user
initial_capital = 10000

[sqlite]
path = ledger.db
pool_size = 4

[market]
source = csv
csv_dir = ./data

[signal]
decision_threshold = 40
confidence_boost = 0

[backtest]
initial_capital = 10000
max_shares_per_trade = 10

[autotrade]
symbols = RELIANCE,TCS
interval_secs = 300
min_confidence = 55

[web]
listen = 127.0.0.1:3000
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_int("sqlite", "pool_size", 0), 4);
        assert_eq!(adapter.get_string("market", "source"), Some("csv".into()));
        assert_eq!(adapter.get_double("signal", "decision_threshold", 0.0), 40.0);
        assert_eq!(adapter.get_int("autotrade", "interval_secs", 0), 300);
        assert_eq!(
            adapter.get_string("web", "listen"),
            Some("127.0.0.1:3000".into())
        );
    }
}
