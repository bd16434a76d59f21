use super::snippets::{self, TRIVIAL_PROGRAM, include_line};
use super::{Kind, Report};
use crate::executor::ProbeRequest;
use crate::prelude::*;
use crate::session::Session;

impl Session {
    /// Probes `name` in the registry of `kind` unless an answer is known.
    fn probe_feature(
        &mut self,
        kind: Kind,
        context: Option<&str>,
        name: &str,
        snippet: &str,
        ldflags: &str,
    ) -> Result<Report> {
        let toolchain = &self.toolchain;
        let runner = &mut self.runner;
        self.registries.get_mut(kind).check(context, name, || {
            let request = ProbeRequest::compile(snippet).with_ldflags(ldflags);
            Ok(runner.probe(toolchain, &request)?.success)
        })
    }

    /// Checks that `header` can be included.
    ///
    /// Each dependency is checked first, left to right, and included ahead of
    /// the following ones when found.
    pub fn check_header(&mut self, header: &str, depends: &[&str]) -> Result<Report> {
        let mut preamble = String::new();
        for (index, dependency) in depends.iter().enumerate() {
            let context = depends[..index].join(",");
            let snippet = snippets::header_probe(&preamble, dependency);
            let report =
                self.probe_feature(Kind::Header, Some(&context), dependency, &snippet, "")?;
            debug!("Dependency <{dependency}> of <{header}>: {report}");
            if report.found {
                preamble.push_str(&include_line(dependency));
            }
        }

        let context = depends.join(",");
        let snippet = snippets::header_probe(&preamble, header);
        let report = self.probe_feature(Kind::Header, Some(&context), header, &snippet, "")?;
        self.report_check(Kind::Header, &format!("<{header}>"), report);
        Ok(report)
    }

    /// Checks that `type_name` exists, optionally after including `header`.
    /// A type found through a header marks that header as present.
    pub fn check_type(&mut self, type_name: &str, header: Option<&str>) -> Result<Report> {
        let snippet = snippets::type_probe(type_name, header);
        let report = self.probe_feature(Kind::Type, header, type_name, &snippet, "")?;
        let subject = match header {
            Some(header) => {
                self.registries.headers.register(header, report.found);
                format!("type {type_name} in <{header}>")
            }
            None => format!("type {type_name}"),
        };
        self.report_check(Kind::Type, &subject, report);
        Ok(report)
    }

    /// Checks that `function` links, optionally against `library`.
    /// A function found in a library marks that library as present.
    pub fn check_function(&mut self, function: &str, library: Option<&str>) -> Result<Report> {
        let ldflags = match library {
            Some(library) => self.toolchain.template().library_flag(library)?,
            None => String::new(),
        };
        let snippet = snippets::function_probe(function, self.toolchain.language);
        let report = self.probe_feature(Kind::Function, library, function, &snippet, &ldflags)?;
        let subject = match library {
            Some(library) => {
                self.registries.libraries.register(library, report.found);
                format!("{function}() in library {library}")
            }
            None => format!("{function}()"),
        };
        self.report_check(Kind::Function, &subject, report);
        Ok(report)
    }

    /// Checks that a program links against `library`.
    pub fn check_library(&mut self, library: &str) -> Result<Report> {
        let ldflags = self.toolchain.template().library_flag(library)?;
        let report =
            self.probe_feature(Kind::Library, None, library, TRIVIAL_PROGRAM, &ldflags)?;
        self.report_check(Kind::Library, &format!("library {library}"), report);
        Ok(report)
    }

    pub fn define_header(&mut self, header: &str, found: bool) {
        self.registries.headers.record(None, header, found);
    }

    pub fn define_type(&mut self, type_name: &str, found: bool) {
        self.registries.types.record(None, type_name, found);
    }

    pub fn define_function(&mut self, function: &str, found: bool) {
        self.registries.functions.record(None, function, found);
    }

    pub fn define_library(&mut self, library: &str, found: bool) {
        self.registries.libraries.record(None, library, found);
    }

    /// Adds `#define name value` to the generated header.
    pub fn define_macro(&mut self, name: &str, value: &str) {
        self.macros.insert(name, value.to_string());
    }
}
