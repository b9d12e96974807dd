//! Static Validator: rule-based lint over generated component source.
//!
//! `validate` is total. It never fails and reports issues in rule order:
//!
//! 1. missing `SafeAreaView` wrapper (blocking)
//! 2. `FlatList` without `keyExtractor` (blocking)
//! 3. imports outside the allow-list (blocking)
//! 4. bundled images loaded with `require()` (blocking)
//! 5. device-capability packages from the deny-list (blocking)
//! 6. missing `StatusBar` (advisory)
//! 7. `.map()` rendering JSX where `FlatList` is preferred (advisory)
//!
//! Checks are substring and pattern based; nothing is parsed.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Modules the generated component may import. Sub-paths are allowed too.
pub const ALLOWED_MODULES: &[&str] = &[
    "react",
    "react-native",
    "react-native-safe-area-context",
    "@expo/vector-icons",
    "expo-linear-gradient",
];

/// A device capability the preview cannot provide.
#[derive(Debug, Clone, Copy)]
pub struct DeniedCapability {
    pub capability: &'static str,
    /// Package names and identifiers that reveal use of the capability
    pub names: &'static [&'static str],
}

pub const DENY_LIST: &[DeniedCapability] = &[
    DeniedCapability {
        capability: "storage",
        names: &["AsyncStorage", "@react-native-async-storage/async-storage"],
    },
    DeniedCapability {
        capability: "media",
        names: &["expo-av", "expo-media-library"],
    },
    DeniedCapability {
        capability: "camera",
        names: &["expo-camera"],
    },
    DeniedCapability {
        capability: "location",
        names: &["expo-location"],
    },
    DeniedCapability {
        capability: "notifications",
        names: &["expo-notifications"],
    },
    DeniedCapability {
        capability: "maps",
        names: &["react-native-maps"],
    },
    DeniedCapability {
        capability: "filesystem",
        names: &["expo-file-system"],
    },
    DeniedCapability {
        capability: "contacts",
        names: &["expo-contacts"],
    },
    DeniedCapability {
        capability: "calendar",
        names: &["expo-calendar"],
    },
];

/// Replacement hints for common wrong imports.
const IMPORT_HINTS: &[(&str, &str)] = &[("react-native-vector-icons", "use @expo/vector-icons")];

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:[\w*{}\s,$]+?\s+from\s+)?['"]([^'"]+)['"]"#)
        .expect("import pattern is valid")
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).expect("require pattern is valid")
});

static LOCAL_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)require\(\s*['"][^'"]+\.(?:png|jpe?g|gif|webp)['"]\s*\)"#)
        .expect("local image pattern is valid")
});

static INLINE_MAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\.map\(\s*(?:\([^)]*\)|[\w$]+)\s*=>\s*(?:\(\s*<|<|\{[^}]*?\breturn\s*\(?\s*<)"#,
    )
    .expect("inline map pattern is valid")
});

/// How a finding affects the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Triggers the single repair attempt
    Blocking,
    /// Reported only
    Advisory,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Blocking => "BLOCKING",
            Self::Advisory => "ADVISORY",
        }
    }
}

/// One validator finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    pub fn blocking(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Blocking,
            message: message.into(),
        }
    }

    pub fn advisory(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Advisory,
            message: message.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.label(), self.message)
    }
}

/// Run every rule over `code`.
pub fn validate(code: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !code.contains("SafeAreaView") {
        issues.push(ValidationIssue::blocking("Missing SafeAreaView wrapper"));
    }

    if code.contains("FlatList") && !code.contains("keyExtractor") {
        issues.push(ValidationIssue::blocking(
            "FlatList missing keyExtractor (every item needs a stable key)",
        ));
    }

    let modules = imported_modules(code);
    for module in &modules {
        if is_allowed(module) || denied_capability(module).is_some() {
            continue;
        }
        let hint = IMPORT_HINTS
            .iter()
            .find(|(name, _)| matches_package(module, name));
        let message = match hint {
            Some((_, hint)) => format!("Import outside the allowed modules: {} ({})", module, hint),
            None => format!("Import outside the allowed modules: {}", module),
        };
        issues.push(ValidationIssue::blocking(message));
    }

    if LOCAL_IMAGE_RE.is_match(code) {
        issues.push(ValidationIssue::blocking(
            "Loading a bundled image with require() (use a remote { uri: ... } instead)",
        ));
    }

    for denied in DENY_LIST {
        if let Some(name) = denied.names.iter().find(|name| uses_denied(code, &modules, name)) {
            issues.push(ValidationIssue::blocking(format!(
                "Using unavailable package: {} ({} is not available in the preview)",
                name, denied.capability
            )));
        }
    }

    if !code.contains("StatusBar") {
        issues.push(ValidationIssue::advisory("Missing StatusBar component"));
    }

    if INLINE_MAP_RE.is_match(code) {
        issues.push(ValidationIssue::advisory(
            "Using .map() to render a list (consider FlatList for better performance)",
        ));
    }

    issues
}

/// Blocking subset, order preserved.
pub fn blocking_issues(issues: &[ValidationIssue]) -> Vec<ValidationIssue> {
    issues.iter().filter(|i| i.is_blocking()).cloned().collect()
}

/// Advisory subset, order preserved.
pub fn advisory_issues(issues: &[ValidationIssue]) -> Vec<ValidationIssue> {
    issues.iter().filter(|i| !i.is_blocking()).cloned().collect()
}

/// Module specifiers in order of first appearance, deduplicated.
///
/// Relative `require()` paths are assets or local files and are left to the
/// image rule.
fn imported_modules(code: &str) -> Vec<String> {
    let from_imports = IMPORT_RE.captures_iter(code).map(|c| (c.get(1), true));
    let from_requires = REQUIRE_RE.captures_iter(code).map(|c| (c.get(1), false));

    let mut found: Vec<(usize, String)> = from_imports
        .chain(from_requires)
        .filter_map(|(m, is_import)| {
            let m = m?;
            let spec = m.as_str();
            if !is_import && (spec.starts_with('.') || spec.starts_with('/')) {
                return None;
            }
            Some((m.start(), spec.to_string()))
        })
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let mut modules: Vec<String> = Vec::new();
    for (_, spec) in found {
        if !modules.contains(&spec) {
            modules.push(spec);
        }
    }
    modules
}

fn matches_package(module: &str, package: &str) -> bool {
    module == package
        || module
            .strip_prefix(package)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Package names match imported modules on a package boundary. Bare
/// identifiers such as `AsyncStorage` match anywhere in the source.
fn uses_denied(code: &str, modules: &[String], name: &str) -> bool {
    if name.contains('-') || name.contains('/') {
        modules.iter().any(|module| matches_package(module, name))
    } else {
        code.contains(name)
    }
}

fn is_allowed(module: &str) -> bool {
    ALLOWED_MODULES.iter().any(|allowed| matches_package(module, allowed))
}

fn denied_capability(module: &str) -> Option<&'static DeniedCapability> {
    DENY_LIST
        .iter()
        .find(|denied| denied.names.iter().any(|name| matches_package(module, name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"import React, { useState } from 'react';
import { View, Text, FlatList, StatusBar } from 'react-native';
import { SafeAreaView } from 'react-native-safe-area-context';
import { Ionicons } from '@expo/vector-icons';

export default function GeneratedApp() {
  const [items] = useState([{ id: 1, title: 'One' }]);
  return (
    <SafeAreaView style={{ flex: 1 }} edges={['top', 'bottom']}>
      <StatusBar barStyle="dark-content" />
      <FlatList
        data={items}
        keyExtractor={(item) => item.id.toString()}
        renderItem={({ item }) => <Text>{item.title}</Text>}
      />
    </SafeAreaView>
  );
}
"#;

    fn messages(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn test_clean_component_has_no_issues() {
        assert!(validate(CLEAN).is_empty());
    }

    #[test]
    fn test_empty_input_reports_missing_constructs() {
        let issues = validate("");
        assert_eq!(
            issues,
            vec![
                ValidationIssue::blocking("Missing SafeAreaView wrapper"),
                ValidationIssue::advisory("Missing StatusBar component"),
            ]
        );
    }

    #[test]
    fn test_missing_safe_area_is_first_blocking_issue() {
        let code = r#"import AsyncStorage from '@react-native-async-storage/async-storage';
import Icon from 'react-native-vector-icons/Ionicons';
import { FlatList } from 'react-native';
const logo = require('./assets/logo.png');
<FlatList data={[]} />"#;

        let issues = validate(code);
        let blocking = blocking_issues(&issues);
        assert!(blocking.len() > 1);
        assert_eq!(blocking[0].message, "Missing SafeAreaView wrapper");
        assert_eq!(issues[0], blocking[0]);
    }

    #[test]
    fn test_rule_order_is_stable() {
        let code = r#"import Icon from 'react-native-vector-icons/Ionicons';
import * as Camera from 'expo-camera';
const logo = require('./logo.png');
{items.map(item => (<Text>{item}</Text>))}
<FlatList data={items} />"#;

        let issues = validate(code);
        assert_eq!(
            messages(&issues),
            vec![
                "Missing SafeAreaView wrapper",
                "FlatList missing keyExtractor (every item needs a stable key)",
                "Import outside the allowed modules: react-native-vector-icons/Ionicons (use @expo/vector-icons)",
                "Loading a bundled image with require() (use a remote { uri: ... } instead)",
                "Using unavailable package: expo-camera (camera is not available in the preview)",
                "Missing StatusBar component",
                "Using .map() to render a list (consider FlatList for better performance)",
            ]
        );
        assert_eq!(validate(code), issues);
    }

    #[test]
    fn test_denied_package_reported_once() {
        let code = CLEAN.replace(
            "import { Ionicons } from '@expo/vector-icons';",
            "import * as Location from 'expo-location';",
        );
        let blocking = blocking_issues(&validate(&code));
        assert_eq!(blocking.len(), 1);
        assert!(blocking[0].message.contains("expo-location"));
    }

    #[test]
    fn test_every_capability_is_denied() {
        for denied in DENY_LIST {
            for name in denied.names {
                let code = format!("{}\nimport X from '{}';\n", CLEAN, name);
                let blocking = blocking_issues(&validate(&code));
                assert_eq!(blocking.len(), 1, "{}", name);
                assert!(blocking[0].message.contains(denied.capability));
            }
        }
    }

    #[test]
    fn test_lookalike_package_is_not_denied() {
        let code = format!("import Av from 'expo-av-extras';\n{}", CLEAN);
        assert_eq!(
            messages(&validate(&code)),
            vec!["Import outside the allowed modules: expo-av-extras"]
        );

        let code = format!("{}\nconst sound = require('expo-av/build/Audio');\n", CLEAN);
        assert_eq!(
            messages(&validate(&code)),
            vec!["Using unavailable package: expo-av (media is not available in the preview)"]
        );
    }

    #[test]
    fn test_async_storage_identifier_alone_is_denied() {
        let code = format!("{}\nAsyncStorage.setItem('k', 'v');\n", CLEAN);
        let blocking = blocking_issues(&validate(&code));
        assert_eq!(
            messages(&blocking),
            vec!["Using unavailable package: AsyncStorage (storage is not available in the preview)"]
        );
    }

    #[test]
    fn test_wrong_icon_library_has_hint() {
        let code = CLEAN.replace("@expo/vector-icons", "react-native-vector-icons");
        let blocking = blocking_issues(&validate(&code));
        assert_eq!(
            messages(&blocking),
            vec!["Import outside the allowed modules: react-native-vector-icons (use @expo/vector-icons)"]
        );
    }

    #[test]
    fn test_allowed_sub_paths() {
        let code = format!("import Ionicons from '@expo/vector-icons/Ionicons';\n{}", CLEAN);
        assert!(blocking_issues(&validate(&code)).is_empty());

        let code = format!("import x from 'react-native-extra';\n{}", CLEAN);
        assert_eq!(blocking_issues(&validate(&code)).len(), 1);
    }

    #[test]
    fn test_multiline_and_side_effect_imports() {
        let code = format!(
            "import {{\n  Foo,\n  Bar,\n}} from 'lodash';\nimport 'intl';\n{}",
            CLEAN
        );
        let blocking = blocking_issues(&validate(&code));
        assert_eq!(
            messages(&blocking),
            vec![
                "Import outside the allowed modules: lodash",
                "Import outside the allowed modules: intl",
            ]
        );
    }

    #[test]
    fn test_duplicate_import_reported_once() {
        let code = format!(
            "import a from 'moment';\nconst b = require('moment');\n{}",
            CLEAN
        );
        assert_eq!(blocking_issues(&validate(&code)).len(), 1);
    }

    #[test]
    fn test_remote_image_is_fine() {
        let code = format!(
            "{}\n<Image source={{{{ uri: 'https://via.placeholder.com/150.png' }}}} />\n",
            CLEAN
        );
        assert!(blocking_issues(&validate(&code)).is_empty());
    }

    #[test]
    fn test_local_image_extensions() {
        for path in ["./a.png", "../img/b.JPG", "./c.jpeg", "./d.gif", "./e.webp"] {
            let code = format!("{}\nconst img = require('{}');\n", CLEAN, path);
            let blocking = blocking_issues(&validate(&code));
            assert_eq!(blocking.len(), 1, "{}", path);
        }
    }

    #[test]
    fn test_inline_map_variants() {
        let variants = [
            "{items.map(item => <Text>{item}</Text>)}",
            "{items.map((item, i) => (\n  <Text key={i}>{item}</Text>\n))}",
            "{items.map((item) => {\n  return (\n    <Text>{item}</Text>\n  );\n})}",
            "{items.map((item) => {\n  const active = item.id === selected;\n  return (<Text style={active ? styles.on : styles.off}>{item.title}</Text>);\n})}",
        ];
        for variant in variants {
            let code = format!("{}\n{}\n", CLEAN, variant);
            let advisory = advisory_issues(&validate(&code));
            assert_eq!(advisory.len(), 1, "{}", variant);
        }
    }

    #[test]
    fn test_data_map_is_not_rendering() {
        let code = format!("{}\nconst ids = items.map(item => item.id);\n", CLEAN);
        assert!(validate(&code).is_empty());

        let code = format!(
            "const totals = items.map((item) => {{\n  const n = item.qty * item.price;\n  return n;\n}});\n{}",
            CLEAN
        );
        assert!(validate(&code).is_empty());
    }

    #[test]
    fn test_display_includes_severity() {
        let issue = ValidationIssue::blocking("Missing SafeAreaView wrapper");
        assert_eq!(issue.to_string(), "BLOCKING: Missing SafeAreaView wrapper");
        assert_eq!(
            ValidationIssue::advisory("x").to_string(),
            "ADVISORY: x"
        );
    }
}
