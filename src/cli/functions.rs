//! Signature listing for `jp functions`

use crate::{Config, Registry};

/// Signatures of every function `config` enables, by name, keeping those
/// whose name contains `filter`.
pub fn list_functions(config: &Config, filter: Option<&str>) -> Vec<String> {
    let registry = Registry::builder(config).build();
    registry
        .functions()
        .filter(|f| filter.is_none_or(|needle| f.name.contains(needle)))
        .map(ToString::to_string)
        .collect()
}
