//! Typed configuration registry.
//!
//! The original source keys a process-global mutable registry by free-form
//! strings (e.g. `reg['hdl/lang']`). Spec §6 enumerates the registry keys
//! this core must at least represent: `HierRoot`, `CurrentHier`,
//! `GearMetaParams` (default `{enablement: true}`), `GearExtraParams`
//! (`{name, intfs, outnames, __base__}`), `hdl/include`, `hdl/lang`
//! (default `"sv"`), `hdl/toplang`, `hdl/top`, `hdlgen/disambig`,
//! `debug/trace`. Design Note §9 replaces the free-form string dict with a
//! closed enum of known keys plus a typed value, carried on an explicit
//! [`RegistryDefaults`] struct instead of process-global state -- every
//! [`crate::hier::Hierarchy`]/elaboration context owns its own
//! configuration rather than reaching for ambient globals. `HierRoot` and
//! `CurrentHier` are kept here only as *documented* keys matching spec §6;
//! the actual current-hierarchy pointer is the explicit
//! `ElaborationContext`/`Hierarchy::current_stack` this Rust port uses
//! instead (see `hwgears-elab::context`), so those two keys are always
//! read back as whatever the caller last wrote into the registry, not
//! derived from live hierarchy state.

use serde::{Deserialize, Serialize};

/// A configuration value. `Map`/`List` cover the structured registry
/// entries (`GearMetaParams`, `GearExtraParams`) that are themselves small
/// keyword dictionaries in the original source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Map(Vec<(String, ConfigValue)>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ConfigValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, ConfigValue)]> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up `key` inside a `Map` value (no-op, returning `None`, for
    /// every other variant).
    pub fn field(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Every registry key spec §6 names, as a closed enum rather than an open
/// string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryKey {
    /// Path name of the elaboration's root hierarchy node.
    HierRoot,
    /// Path name of the innermost currently-open hierarchy scope.
    CurrentHier,
    /// Default gear construction parameters merged into every gear's
    /// parameter map before inference (spec §6: default `{enablement: true}`).
    GearMetaParams,
    /// Parameter names the elaborator injects into every gear call besides
    /// the user-declared ones (spec §6: `{name, intfs, outnames, __base__}`).
    GearExtraParams,
    /// Extra search paths the (out-of-scope) HDL backend includes when
    /// resolving referenced modules.
    HdlInclude,
    /// HDL dialect the code-shape generator's consumer emits (default `"sv"`).
    HdlLang,
    /// Language of the top-level testbench/harness wrapper, if different
    /// from `HdlLang`.
    HdlToplang,
    /// Name of the top-level module to elaborate.
    HdlTop,
    /// Enables/disables `hwgears_core::hier::Hierarchy::disambiguate_name`
    /// style module-name disambiguation in the HDL backend.
    HdlgenDisambig,
    /// Debug tracing verbosity for the elaboration/HLS pipeline.
    DebugTrace,
}

/// Owns the current value for every [`RegistryKey`], seeded with the
/// defaults the original source ships.
#[derive(Debug, Clone)]
pub struct RegistryDefaults {
    hier_root: ConfigValue,
    current_hier: ConfigValue,
    gear_meta_params: ConfigValue,
    gear_extra_params: ConfigValue,
    hdl_include: ConfigValue,
    hdl_lang: ConfigValue,
    hdl_toplang: ConfigValue,
    hdl_top: ConfigValue,
    hdlgen_disambig: ConfigValue,
    debug_trace: ConfigValue,
}

impl Default for RegistryDefaults {
    fn default() -> Self {
        RegistryDefaults {
            hier_root: ConfigValue::Text(String::new()),
            current_hier: ConfigValue::Text(String::new()),
            gear_meta_params: ConfigValue::Map(vec![(
                "enablement".to_string(),
                ConfigValue::Bool(true),
            )]),
            gear_extra_params: ConfigValue::Map(vec![
                ("name".to_string(), ConfigValue::Text(String::new())),
                ("intfs".to_string(), ConfigValue::List(Vec::new())),
                ("outnames".to_string(), ConfigValue::List(Vec::new())),
                ("__base__".to_string(), ConfigValue::Text(String::new())),
            ]),
            hdl_include: ConfigValue::List(Vec::new()),
            hdl_lang: ConfigValue::Text("sv".to_string()),
            hdl_toplang: ConfigValue::Text(String::new()),
            hdl_top: ConfigValue::Text(String::new()),
            hdlgen_disambig: ConfigValue::Bool(true),
            debug_trace: ConfigValue::Bool(false),
        }
    }
}

impl RegistryDefaults {
    pub fn get(&self, key: RegistryKey) -> &ConfigValue {
        match key {
            RegistryKey::HierRoot => &self.hier_root,
            RegistryKey::CurrentHier => &self.current_hier,
            RegistryKey::GearMetaParams => &self.gear_meta_params,
            RegistryKey::GearExtraParams => &self.gear_extra_params,
            RegistryKey::HdlInclude => &self.hdl_include,
            RegistryKey::HdlLang => &self.hdl_lang,
            RegistryKey::HdlToplang => &self.hdl_toplang,
            RegistryKey::HdlTop => &self.hdl_top,
            RegistryKey::HdlgenDisambig => &self.hdlgen_disambig,
            RegistryKey::DebugTrace => &self.debug_trace,
        }
    }

    pub fn set(&mut self, key: RegistryKey, value: ConfigValue) {
        match key {
            RegistryKey::HierRoot => self.hier_root = value,
            RegistryKey::CurrentHier => self.current_hier = value,
            RegistryKey::GearMetaParams => self.gear_meta_params = value,
            RegistryKey::GearExtraParams => self.gear_extra_params = value,
            RegistryKey::HdlInclude => self.hdl_include = value,
            RegistryKey::HdlLang => self.hdl_lang = value,
            RegistryKey::HdlToplang => self.hdl_toplang = value,
            RegistryKey::HdlTop => self.hdl_top = value,
            RegistryKey::HdlgenDisambig => self.hdlgen_disambig = value,
            RegistryKey::DebugTrace => self.debug_trace = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_section_6() {
        let defaults = RegistryDefaults::default();
        assert_eq!(defaults.get(RegistryKey::HdlLang).as_text(), Some("sv"));
        assert_eq!(
            defaults
                .get(RegistryKey::GearMetaParams)
                .field("enablement")
                .and_then(ConfigValue::as_bool),
            Some(true)
        );
    }

    #[test]
    fn gear_extra_params_default_has_all_four_fields() {
        let defaults = RegistryDefaults::default();
        let extra = defaults.get(RegistryKey::GearExtraParams);
        for key in ["name", "intfs", "outnames", "__base__"] {
            assert!(extra.field(key).is_some(), "missing field {key}");
        }
    }

    #[test]
    fn set_and_get_roundtrip() {
        let mut defaults = RegistryDefaults::default();
        defaults.set(RegistryKey::HdlLang, ConfigValue::Text("vhdl".into()));
        assert_eq!(defaults.get(RegistryKey::HdlLang).as_text(), Some("vhdl"));
    }

    #[test]
    fn hdl_include_defaults_to_empty_list() {
        let defaults = RegistryDefaults::default();
        assert_eq!(defaults.get(RegistryKey::HdlInclude).as_list(), Some(&[][..]));
    }
}
