//! Environment variable transformation and the environment variable source.
//!
//! Names are normalized like every other key, so `Logging__Level` lands at
//! `logging:level`. Four legacy connection-string prefixes are rewritten into
//! the `connectionstrings:` namespace:
//!
//! | variable                 | key                          | provider key                                |
//! |--------------------------|------------------------------|---------------------------------------------|
//! | `MYSQLCONNSTR_<name>`    | `connectionstrings:<name>`   | `<name>_providername = MySql.Data.MySqlClient` |
//! | `SQLAZURECONNSTR_<name>` | `connectionstrings:<name>`   | `<name>_providername = System.Data.SqlClient`  |
//! | `SQLCONNSTR_<name>`      | `connectionstrings:<name>`   | `<name>_providername = System.Data.SqlClient`  |
//! | `CUSTOMCONNSTR_<name>`   | `connectionstrings:<name>`   | none                                        |
//!
//! The optional prefix filter is lower-cased but `__` in it is *not*
//! rewritten, so a prefix written with `__` never matches a name that used
//! `__` as a separator.

use crate::config::Config;
use crate::error::Result;
use crate::key::{KEY_DELIMITER, join_key, normalize_key};
use crate::source::{FlatMap, Source};
use std::collections::BTreeMap;
use std::sync::Arc;

const MYSQL_PREFIX: &str = "mysqlconnstr_";
const SQL_AZURE_PREFIX: &str = "sqlazureconnstr_";
const SQL_SERVER_PREFIX: &str = "sqlconnstr_";
const CUSTOM_PREFIX: &str = "customconnstr_";

const CONNECTION_STRINGS: &str = "connectionstrings";
const PROVIDER_NAME_SUFFIX: &str = "_providername";

const MYSQL_PROVIDER: &str = "MySql.Data.MySqlClient";
const SQL_SERVER_PROVIDER: &str = "System.Data.SqlClient";

/// Checked in order; `sqlazureconnstr_` must win over `sqlconnstr_`.
const CONNECTION_STRING_PREFIXES: [(&str, Option<&str>); 4] = [
    (MYSQL_PREFIX, Some(MYSQL_PROVIDER)),
    (SQL_AZURE_PREFIX, Some(SQL_SERVER_PROVIDER)),
    (SQL_SERVER_PREFIX, Some(SQL_SERVER_PROVIDER)),
    (CUSTOM_PREFIX, None),
];

/// Strip `prefix` and then at most one delimiter.
fn strip_prefix_and_delimiter<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(prefix)?;
    Some(rest.strip_prefix(KEY_DELIMITER).unwrap_or(rest))
}

struct EnvVarsTransformer {
    prefix: String,
    data: FlatMap,
}

impl EnvVarsTransformer {
    fn new(prefix: &str) -> Self {
        Self {
            // Lower-cased only: `__` in the prefix stays as-is.
            prefix: prefix.to_lowercase(),
            data: FlatMap::new(),
        }
    }

    fn load(&mut self, key: &str, value: &str) {
        let key = normalize_key(key);

        let legacy = CONNECTION_STRING_PREFIXES
            .iter()
            .find(|(prefix, _)| key.starts_with(prefix));

        let Some((prefix, provider)) = legacy else {
            self.add_if_prefixed(key, value);
            return;
        };

        let name = strip_prefix_and_delimiter(&key, prefix).unwrap_or_default();
        let connection_key = join_key(CONNECTION_STRINGS, name);
        let provider_key = format!("{connection_key}{PROVIDER_NAME_SUFFIX}");
        self.add_if_prefixed(connection_key, value);
        if let Some(provider) = provider {
            self.add_if_prefixed(provider_key, provider);
        }
    }

    fn add_if_prefixed(&mut self, key: String, value: &str) {
        let key = if self.prefix.is_empty() {
            key
        } else {
            match strip_prefix_and_delimiter(&key, &self.prefix) {
                Some(stripped) => stripped.to_string(),
                None => return,
            }
        };

        if self.data.insert(key.clone(), value.to_string()).is_some() {
            tracing::debug!(key = %key, "environment variable key collision, later variable wins");
        }
    }
}

/// Transform raw environment variables into a flat map.
///
/// Raw names are processed in ascending order, so when two variables end up
/// at the same key the one with the greater raw name wins.
pub fn transform_env_vars<I, K, V>(vars: I, prefix: &str) -> FlatMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let sorted: BTreeMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    let mut transformer = EnvVarsTransformer::new(prefix);
    for (key, value) in &sorted {
        transformer.load(key, value);
    }
    transformer.data
}

#[derive(Debug, Clone)]
enum Backing {
    /// Read from the process environment on every build.
    Process,
    Map(BTreeMap<String, String>),
}

/// Source over environment variables.
#[derive(Debug, Clone)]
pub struct EnvVarsSource {
    name: String,
    prefix: String,
    backing: Backing,
}

impl EnvVarsSource {
    /// Variables of the running process, captured each time the source is
    /// built.
    pub fn from_process(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            name: format!("EnvVarsSource Prefix: '{prefix}'"),
            prefix,
            backing: Backing::Process,
        }
    }

    /// Same as [`EnvVarsSource::from_process`] but over a caller-supplied map.
    pub fn from_map<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prefix = prefix.into();
        Self {
            name: format!("EnvVarsMapSource Prefix: '{prefix}'"),
            prefix,
            backing: Backing::Map(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

fn process_vars() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| match (k.into_string(), v.into_string()) {
            (Ok(k), Ok(v)) => Some((k, v)),
            (k, _) => {
                tracing::debug!(
                    var = ?k.unwrap_or_else(|os| os.to_string_lossy().into_owned()),
                    "skipping environment variable that is not valid unicode"
                );
                None
            }
        })
        .collect()
}

impl Source for EnvVarsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(self: Arc<Self>) -> Result<Config> {
        let data = match &self.backing {
            Backing::Process => transform_env_vars(process_vars(), &self.prefix),
            Backing::Map(vars) => transform_env_vars(vars, &self.prefix),
        };
        tracing::trace!(source = %self.name, keys = data.len(), "transformed environment variables");
        Ok(Config::new(self, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn build(prefix: &str, vars: &[(&str, &str)]) -> Config {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Arc::new(EnvVarsSource::from_map(prefix, vars)).build().unwrap()
    }

    #[test]
    fn test_load_key_value_pairs() {
        let config = build(
            "",
            &[
                ("DefaultConnection:ConnectionString", "TestConnectionString"),
                ("DefaultConnection:Provider", "SqlClient"),
                ("Inventory:ConnectionString", "AnotherTestConnectionString"),
                ("Inventory:Provider", "MySql"),
            ],
        );
        assert_eq!(config.get("defaultconnection:ConnectionString"), "TestConnectionString");
        assert_eq!(config.get("DEFAULTCONNECTION:PROVIDER"), "SqlClient");
        assert_eq!(config.get("Inventory:CONNECTIONSTRING"), "AnotherTestConnectionString");
        assert_eq!(config.get("Inventory:Provider"), "MySql");
        assert_eq!(config.source().name(), "EnvVarsMapSource Prefix: ''");
    }

    #[test]
    fn test_load_key_value_pairs_with_prefix() {
        let config = build(
            "DefaultConnection",
            &[
                ("DefaultConnection:ConnectionString", "TestConnectionString"),
                ("DefaultConnection:Provider", "SqlClient"),
                ("Inventory:ConnectionString", "AnotherTestConnectionString"),
            ],
        );
        assert_eq!(config.get("ConnectionString"), "TestConnectionString");
        assert_eq!(config.get("Provider"), "SqlClient");
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_connection_string_prefixes() {
        let config = build(
            "",
            &[
                ("APPSETTING_AppName", "TestAppName"),
                ("CUSTOMCONNSTR_db1", "CustomConnStr"),
                ("SQLCONNSTR_db2", "SQLConnStr"),
                ("MYSQLCONNSTR_db3", "MySQLConnStr"),
                ("SQLAZURECONNSTR_db4", "SQLAzureConnStr"),
                ("CommonEnv", "CommonEnvValue"),
            ],
        );
        assert_eq!(config.get("APPSETTING_AppName"), "TestAppName");
        assert_eq!(config.try_get("AppName"), None);
        assert_eq!(config.get("ConnectionStrings:db1"), "CustomConnStr");
        assert_eq!(config.try_get("ConnectionStrings:db1_ProviderName"), None);
        assert_eq!(config.get("ConnectionStrings:db2"), "SQLConnStr");
        assert_eq!(config.get("ConnectionStrings:db2_ProviderName"), "System.Data.SqlClient");
        assert_eq!(config.get("ConnectionStrings:db3"), "MySQLConnStr");
        assert_eq!(config.get("ConnectionStrings:db3_ProviderName"), "MySql.Data.MySqlClient");
        assert_eq!(config.get("ConnectionStrings:db4"), "SQLAzureConnStr");
        assert_eq!(config.get("ConnectionStrings:db4_ProviderName"), "System.Data.SqlClient");
        assert_eq!(config.get("CommonEnv"), "CommonEnvValue");
    }

    #[test]
    fn test_connection_string_prefixes_with_prefix_filter() {
        let config = build(
            "ConnectionStrings:",
            &[
                ("CUSTOMCONNSTR_db1", "CustomConnStr"),
                ("SQLCONNSTR_db2", "SQLConnStr"),
                ("MYSQLCONNSTR_db3", "MySQLConnStr"),
                ("SQLAZURECONNSTR_db4", "SQLAzureConnStr"),
                ("CommonEnv", "CommonEnvValue"),
            ],
        );
        assert_eq!(config.get("db1"), "CustomConnStr");
        assert_eq!(config.get("db2"), "SQLConnStr");
        assert_eq!(config.get("db2_ProviderName"), "System.Data.SqlClient");
        assert_eq!(config.get("db3_ProviderName"), "MySql.Data.MySqlClient");
        assert_eq!(config.get("db4_ProviderName"), "System.Data.SqlClient");
        assert_eq!(config.try_get("CommonEnv"), None);
    }

    #[test]
    fn test_mysql_with_empty_prefix() {
        let data = transform_env_vars([("MYSQLCONNSTR_db", "server=db")], "");
        assert_eq!(data.get("connectionstrings:db").map(String::as_str), Some("server=db"));
        assert_eq!(
            data.get("connectionstrings:db_providername").map(String::as_str),
            Some("MySql.Data.MySqlClient")
        );
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_prefix_filters_and_strips() {
        let data = transform_env_vars(
            [
                ("MYAPP_SETTING_A", "A"),
                ("MYAPP_SETTING_B", "B"),
                ("OTHERAPP_SETTING_A", "A"),
            ],
            "MYAPP_",
        );
        let keys: Vec<_> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["setting_a", "setting_b"]);
    }

    #[test]
    fn test_collision_later_raw_key_wins() {
        // "ConnectionStrings:db2" sorts before "SQLCONNSTR_db2".
        let config = build(
            "",
            &[("SQLCONNSTR_db2", "SQLConnStr"), ("ConnectionStrings:db2", "CommonEnvValue")],
        );
        assert_eq!(config.get("ConnectionStrings:db2"), "SQLConnStr");
        assert_eq!(config.get("ConnectionStrings:db2_ProviderName"), "System.Data.SqlClient");
    }

    #[test]
    fn test_same_name_different_case_is_deterministic() {
        let config = build(
            "",
            &[
                ("CommonEnv", "CommonEnvValue1"),
                ("commonenv", "commonenvValue2"),
                ("cOMMonEnv", "commonenvValue3"),
            ],
        );
        // Ascending raw order: "CommonEnv" < "cOMMonEnv" < "commonenv".
        assert_eq!(config.get("CommonEnv"), "commonenvValue2");
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_double_underscore_is_replaced() {
        let config = build(
            "",
            &[("data__ConnectionString", "connection"), ("SQLCONNSTR_db1", "connStr")],
        );
        assert_eq!(config.get("data:ConnectionString"), "connection");
        assert_eq!(config.get("ConnectionStrings:db1_ProviderName"), "System.Data.SqlClient");
    }

    #[test]
    fn test_double_underscore_in_prefix_is_not_replaced() {
        let config = build(
            "test__prefix__with__double__underscores__",
            &[(
                "test__prefix__with__double__underscores__data__ConnectionString",
                "connection",
            )],
        );
        assert_eq!(config.get("data:ConnectionString"), "");
        assert!(config.is_empty());
    }

    #[test]
    fn test_anomalous_prefix_matches_normalized_key() {
        let config = build(
            "::_EXPERIMENTAL:",
            &[("_____EXPERIMENTAL__data__ConnectionString", "connection")],
        );
        assert_eq!(config.get("data:ConnectionString"), "connection");
    }

    #[test]
    fn test_duplicated_prefix_does_not_match() {
        let config = build("test__", &[("test__test__ConnectionString", "connection")]);
        assert_eq!(config.try_get("test:ConnectionString"), None);
    }

    #[test]
    fn test_prefix_prevents_loading_sql_connection_strings() {
        let config = build(
            "test:",
            &[("test__test__ConnectionString", "connection"), ("SQLCONNSTR_db1", "connStr")],
        );
        assert_eq!(config.get("test:ConnectionString"), "connection");
        assert_eq!(config.try_get("ConnectionStrings:db1_ProviderName"), None);
    }

    #[test]
    fn test_empty_prefix_keeps_leading_delimiter() {
        let data = transform_env_vars([("__leading", "x")], "");
        assert_eq!(data.get(":leading").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_with_name_and_prefix_accessors() {
        let source = EnvVarsSource::from_map("APP_", Vec::<(String, String)>::new()).with_name("env");
        assert_eq!(source.name(), "env");
        assert_eq!(source.prefix(), "APP_");
        assert_eq!(
            EnvVarsSource::from_process("APP_").name(),
            "EnvVarsSource Prefix: 'APP_'"
        );
    }

    #[test]
    #[serial]
    fn test_process_source_reads_environment_at_build_time() {
        // SAFETY: This test runs serially via #[serial] to avoid data races
        unsafe {
            std::env::set_var("LAYERED_CONFIG_TEST__FOO", "foo value = with equal sign");
            std::env::set_var("LAYERED_CONFIG_TEST__BAR", "bar value");
        }

        let source = Arc::new(EnvVarsSource::from_process("layered_config_test:"));
        let first = Arc::clone(&source).build().unwrap();
        assert_eq!(first.get("foo"), "foo value = with equal sign");
        assert_eq!(first.get("bar"), "bar value");

        // SAFETY: This test runs serially via #[serial] to avoid data races
        unsafe {
            std::env::set_var("LAYERED_CONFIG_TEST__BAR", "changed value");
        }

        let second = Arc::clone(&source).build().unwrap();
        assert_eq!(second.get("bar"), "changed value");
        // Snapshots are never touched by later builds.
        assert_eq!(first.get("bar"), "bar value");

        // SAFETY: This test runs serially via #[serial] to avoid data races
        unsafe {
            std::env::remove_var("LAYERED_CONFIG_TEST__FOO");
            std::env::remove_var("LAYERED_CONFIG_TEST__BAR");
        }
    }
}
