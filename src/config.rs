use serde::{Deserialize, Serialize};

/// Interpreter configuration, fixed when the interpreter is built.
///
/// Every optional function group is enabled by default. The JSON form uses
/// camelCase keys, and missing keys keep their defaults:
///
/// ```
/// use jp_policy::Config;
///
/// let config = Config::from_json(r#"{"timeFunctions": false, "maxDepth": 64}"#).unwrap();
/// assert!(!config.time_functions);
/// assert!(config.string_functions);
/// assert_eq!(config.max_depth, Some(64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// String and regex helpers (`to_upper`, `regex_match`, ...)
    pub string_functions: bool,

    /// Timestamp helpers (`time_now`, `time_add`, ...)
    pub time_functions: bool,

    /// Unit-aware arithmetic (`add`, `divide`, `sum`, ...)
    pub arithmetic_functions: bool,

    /// `base64_encode`, `base64_decode`, `parse_json`
    pub encoding_functions: bool,

    /// Function names to leave out of the registry
    pub disabled: Vec<String>,

    /// Maximum AST depth accepted by `compile`
    pub max_depth: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            string_functions: true,
            time_functions: true,
            arithmetic_functions: true,
            encoding_functions: true,
            disabled: Vec::new(),
            max_depth: None,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Only the core query functions.
    pub fn minimal() -> Self {
        Config {
            string_functions: false,
            time_functions: false,
            arithmetic_functions: false,
            encoding_functions: false,
            ..Config::default()
        }
    }
}
