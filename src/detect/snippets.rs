//! C sources that only build when the probed feature is available.

use crate::executor::Language;

pub const TRIVIAL_PROGRAM: &str = "int main(void) { return 0; }\n";

pub fn include_line(header: &str) -> String {
    format!("#include <{header}>\n")
}

/// `preamble` holds the includes of the header's dependencies.
pub fn header_probe(preamble: &str, header: &str) -> String {
    format!("{preamble}#include <{header}>\n{TRIVIAL_PROGRAM}")
}

pub fn type_probe(type_name: &str, header: Option<&str>) -> String {
    let include = header.map(include_line).unwrap_or_default();
    format!(
        "{include}int main(void) {{ int size;\nsize = sizeof({type_name});\nreturn size == 0;}}\n"
    )
}

/// Declares the function with a dummy prototype so only the linker decides.
pub fn function_probe(function: &str, language: Language) -> String {
    let linkage = match language {
        Language::C => "",
        Language::Cpp => "extern \"C\"\n",
    };
    format!("{linkage}char {function}();\nint main(void) {{ {function}(); return 0;}}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_probe_with_dependencies() {
        let preamble = include_line("sys/types.h");
        insta::assert_snapshot!(header_probe(&preamble, "sys/socket.h"), @r"
        #include <sys/types.h>
        #include <sys/socket.h>
        int main(void) { return 0; }
        ");
    }

    #[test]
    fn test_type_probe() {
        insta::assert_snapshot!(type_probe("int64_t", Some("stdint.h")), @r"
        #include <stdint.h>
        int main(void) { int size;
        size = sizeof(int64_t);
        return size == 0;}
        ");
        assert!(type_probe("long long", None).starts_with("int main"));
    }

    #[test]
    fn test_function_probe_c() {
        assert_eq!(
            function_probe("sqrt", Language::C),
            "char sqrt();\nint main(void) { sqrt(); return 0;}\n"
        );
    }

    #[test]
    fn test_function_probe_cpp_uses_c_linkage() {
        assert!(function_probe("sqrt", Language::Cpp).starts_with("extern \"C\"\nchar sqrt();"));
    }
}
