use std::env;
use std::path::PathBuf;

use cdetect_shared::{DynString, Regex};

use crate::emit::substitute::substitute;
use crate::prelude::*;
use crate::session::Session;

impl Session {
    pub fn tool(&self, name: &str) -> Option<&str> {
        self.tools.get(name).map(String::as_str)
    }

    /// Defines a substitution variable. Tokens in `value` are resolved
    /// against the variables defined so far.
    pub fn define_tool(&mut self, name: &str, value: &str) {
        let value = substitute(value, &self.tools);
        self.tools.insert(name, value);
    }

    pub fn define_tool_bool(&mut self, name: &str, flag: bool) {
        self.tools
            .insert(name, if flag { "1" } else { "0" }.to_string());
    }

    /// Defines `name` as the output of `command`, line breaks removed.
    ///
    /// Nothing is defined when the command fails or, with `expect`, when its
    /// output does not match the pattern.
    pub fn define_tool_command(
        &mut self,
        name: &str,
        command: &str,
        expect: Option<&Regex>,
    ) -> Result<bool> {
        let outcome = self.execute_command(command)?;
        if !outcome.success {
            self.report_result(name, "no");
            return Ok(false);
        }

        let mut output = DynString::from(outcome.output);
        output.trim(b"\r\n");
        let value = output.to_string_lossy().into_owned();
        if let Some(expect) = expect {
            if !expect.is_full_match(&value) {
                debug!("Output {value:?} of `{command}` does not match {:?}", expect.as_str());
                self.report_result(name, "no");
                return Ok(false);
            }
        }

        self.report_result(name, &value);
        self.tools.insert(name, value);
        Ok(true)
    }

    /// Resolves `program` in the configured search path, first entry first.
    pub(crate) fn find_program(&self, program: &str) -> Option<PathBuf> {
        let search_path = env::join_paths(&self.config.search_path).ok()?;
        which::which_in(program, Some(search_path), &self.config.work_dir).ok()
    }

    /// Defines `name` as the path of the first of `programs` found in the
    /// search path. An already defined tool is kept as is.
    pub fn check_tool(&mut self, name: &str, programs: &[&str]) -> Result<Option<String>> {
        if let Some(value) = self.tools.get(name) {
            debug!("{name} already set to {value}");
            return Ok(Some(value.clone()));
        }

        let found = programs
            .iter()
            .find_map(|program| self.find_program(program))
            .map(|path| path.to_string_lossy().into_owned());
        match found {
            Some(path) => {
                self.report_result(name, &path);
                self.tools.insert(name, path.clone());
                Ok(Some(path))
            }
            None => {
                self.report_result(name, "no");
                Ok(None)
            }
        }
    }
}
