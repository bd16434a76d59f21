//! The generated `config.h`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use cdetect_shared::{Arg, OrderedMap, format};
use serde::Deserialize;

use crate::detect::{Kind, Registries, Registry};
use crate::prelude::*;

/// `printf` templates turning a registry name into a macro name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacroFormats {
    pub header: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub function: String,
    pub library: String,
}

impl Default for MacroFormats {
    fn default() -> Self {
        MacroFormats {
            header: "CDETECT_HEADER_%s".to_string(),
            type_: "CDETECT_TYPE_%s".to_string(),
            function: "CDETECT_FUNC_%s".to_string(),
            library: "CDETECT_LIB_%s".to_string(),
        }
    }
}

impl MacroFormats {
    pub fn get(&self, kind: Kind) -> &str {
        match kind {
            Kind::Header => &self.header,
            Kind::Type => &self.type_,
            Kind::Function => &self.function,
            Kind::Library => &self.library,
        }
    }
}

/// Upper-cases alphanumerics, maps `*` to `P` and anything else to `_`.
pub fn transform_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c.to_ascii_uppercase(),
            '*' => 'P',
            _ => '_',
        })
        .collect()
}

pub fn macro_name(template: &str, name: &str) -> Result<String> {
    let raw = format(template, &[Arg::from(name)])
        .with_context(|| format!("Invalid macro format {template:?}"))?;
    Ok(transform_name(&raw.to_string_lossy()))
}

pub fn include_guard(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    transform_name(&format!("CDETECT_INCLUDE_GUARD_{file_name}"))
}

pub fn render(
    path: &Path,
    host_macros: &[(String, String)],
    registries: &Registries,
    formats: &MacroFormats,
    macros: &OrderedMap<String>,
) -> Result<String> {
    let guard = include_guard(path);
    let mut lines = vec![
        format!("/* Autogenerated by cdetect {} */", crate::VERSION),
        format!("#ifndef {guard}"),
        format!("#define {guard}"),
        String::new(),
    ];

    for (name, value) in host_macros {
        lines.push(format!("#define {name} {value}"));
    }

    let mut emitted = HashSet::new();
    for (kind, registry) in registries.iter() {
        for (key, value) in registry.found_keys() {
            let name = macro_name(formats.get(kind), Registry::name_of(key))?;
            if emitted.insert(name.clone()) {
                lines.push(format!("#define {name} {value}"));
            }
        }
    }

    for (name, value) in macros.iter() {
        lines.push(format!("#define {name} {value}"));
    }

    lines.push(String::new());
    lines.push(format!("#endif /* {guard} */"));
    Ok(lines.into_iter().map(|line| line + "\n").collect())
}

pub fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("stdio.h", "STDIO_H")]
    #[case("sys/socket.h", "SYS_SOCKET_H")]
    #[case("char*", "CHARP")]
    #[case("unsigned long long", "UNSIGNED_LONG_LONG")]
    fn test_transform_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(transform_name(name), expected);
    }

    #[test]
    fn test_render_header() {
        let mut registries = Registries::default();
        registries.headers.record(None, "stdio.h", true);
        registries.headers.record(None, "nonsense.h", false);
        registries.headers.record(Some("sys/types.h"), "sys/socket.h", true);
        registries.headers.record(Some("sys/types.h,netinet/in.h"), "sys/socket.h", true);
        registries.types.record(Some("stdint.h"), "int64_t", true);
        registries.functions.record(Some("m"), "sqrt", true);
        registries.libraries.record(None, "m", true);

        let mut macros = OrderedMap::new();
        macros.insert("PACKAGE_NAME", "\"demo\"".to_string());
        let host = vec![("CDETECT_COMPILER_GCC".to_string(), "0xb020000".to_string())];

        let rendered = render(
            &PathBuf::from("/tmp/build/config.h"),
            &host,
            &registries,
            &MacroFormats::default(),
            &macros,
        )
        .unwrap()
        .replace(crate::VERSION, "<version>");

        insta::assert_snapshot!(rendered, @r#"
        /* Autogenerated by cdetect <version> */
        #ifndef CDETECT_INCLUDE_GUARD_CONFIG_H
        #define CDETECT_INCLUDE_GUARD_CONFIG_H

        #define CDETECT_COMPILER_GCC 0xb020000
        #define CDETECT_HEADER_STDIO_H 1
        #define CDETECT_HEADER_SYS_SOCKET_H 1
        #define CDETECT_TYPE_INT64_T 1
        #define CDETECT_FUNC_SQRT 1
        #define CDETECT_LIB_M 1
        #define PACKAGE_NAME "demo"

        #endif /* CDETECT_INCLUDE_GUARD_CONFIG_H */
        "#);
    }

    #[test]
    fn test_custom_formats() {
        let formats = MacroFormats {
            header: "HAVE_%s".to_string(),
            ..MacroFormats::default()
        };
        assert_eq!(macro_name(formats.get(Kind::Header), "sys/stat.h").unwrap(), "HAVE_SYS_STAT_H");
        assert_eq!(macro_name(formats.get(Kind::Library), "z").unwrap(), "CDETECT_LIB_Z");
    }

    #[test]
    fn test_formats_from_yaml() {
        let formats: MacroFormats = serde_yaml::from_str("header: HAVE_%s_H\ntype: HAVE_TYPE_%s\n").unwrap();
        assert_eq!(formats.header, "HAVE_%s_H");
        assert_eq!(formats.type_, "HAVE_TYPE_%s");
        assert_eq!(formats.function, "CDETECT_FUNC_%s");
    }
}
