//! Compiler, kernel and CPU fingerprint of the target.
//!
//! A small C program reports the three components on one line; each
//! requested component becomes a `CDETECT_<ASPECT>_<NAME>` macro holding its
//! packed version.

use std::fmt::Display;
use std::path::PathBuf;

use cdetect_shared::{Captured, scan};
use serde::Deserialize;

use crate::emit::header::transform_name;
use crate::prelude::*;
use crate::session::Session;

pub const HOST_LINE_FORMAT: &str = "### %^[^:]:%x %^[^:]:%x %^[^:]:%x";

/// Bundled fingerprint program.
///
/// It recognizes GCC, Clang, MSVC and the Intel compiler, reads the kernel
/// release from `uname` (or reports `windows`), and names the CPU from the
/// predefined architecture macros. The CPU version is always 0. Versions are
/// packed as `(version << 24) + (revision << 16) + patch` by `PACK`. Plans
/// needing other platforms can point `host_probe` at their own program.
pub const HOST_PROBE_SOURCE: &str = r####"#include <stdio.h>
#if defined(__unix__) || defined(__unix) || (defined(__APPLE__) && defined(__MACH__))
#include <sys/utsname.h>
#define HAVE_UNAME 1
#endif

#define PACK(v, r, p) (((unsigned long)(v) << 24) + ((unsigned long)(r) << 16) + (unsigned long)(p))

static unsigned long parse_release(const char *release)
{
  unsigned long part[3] = {0, 0, 0};
  int i = 0;
  while (*release && i < 3) {
    if (*release >= '0' && *release <= '9') {
      part[i] = part[i] * 10 + (unsigned long)(*release - '0');
    } else if (*release == '.') {
      i++;
    } else {
      break;
    }
    release++;
  }
  return PACK(part[0], part[1], part[2]);
}

int main(void)
{
  const char *compiler = "unknown";
  unsigned long compiler_version = 0;
  const char *kernel = "unknown";
  unsigned long kernel_version = 0;
  const char *cpu = "unknown";
#if defined(HAVE_UNAME)
  struct utsname host;
#endif

#if defined(__clang__)
  compiler = "clang";
  compiler_version = PACK(__clang_major__, __clang_minor__, __clang_patchlevel__);
#elif defined(__INTEL_COMPILER)
  compiler = "intel";
  compiler_version = PACK(__INTEL_COMPILER / 100, __INTEL_COMPILER % 100, 0);
#elif defined(__GNUC__)
  compiler = "gcc";
  compiler_version = PACK(__GNUC__, __GNUC_MINOR__, __GNUC_PATCHLEVEL__);
#elif defined(_MSC_VER)
  compiler = "msvc";
  compiler_version = PACK(_MSC_VER / 100, _MSC_VER % 100, 0);
#endif

#if defined(__x86_64__) || defined(_M_X64)
  cpu = "x86_64";
#elif defined(__i386__) || defined(_M_IX86)
  cpu = "x86";
#elif defined(__aarch64__) || defined(_M_ARM64)
  cpu = "arm64";
#elif defined(__arm__) || defined(_M_ARM)
  cpu = "arm";
#elif defined(__powerpc64__)
  cpu = "ppc64";
#elif defined(__powerpc__)
  cpu = "ppc";
#elif defined(__riscv)
  cpu = "riscv";
#elif defined(__s390x__)
  cpu = "s390x";
#endif

#if defined(HAVE_UNAME)
  if (uname(&host) >= 0) {
    kernel = host.sysname;
    kernel_version = parse_release(host.release);
  }
#elif defined(_WIN32)
  kernel = "windows";
#endif

  printf("### %s:%lx %s:%lx %s:0\n", compiler, compiler_version, kernel, kernel_version, cpu);
  return 0;
}
"####;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostAspect {
    Compiler,
    Kernel,
    Cpu,
}

impl HostAspect {
    pub const ALL: [HostAspect; 3] = [HostAspect::Compiler, HostAspect::Kernel, HostAspect::Cpu];

    fn macro_prefix(&self) -> &'static str {
        match self {
            HostAspect::Compiler => "CDETECT_COMPILER_",
            HostAspect::Kernel => "CDETECT_KERNEL_",
            HostAspect::Cpu => "CDETECT_CPU_",
        }
    }
}

impl Display for HostAspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostAspect::Compiler => write!(f, "compiler"),
            HostAspect::Kernel => write!(f, "kernel"),
            HostAspect::Cpu => write!(f, "cpu"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub version: u64,
}

impl Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} 0x{:x}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub compiler: Component,
    pub kernel: Component,
    pub cpu: Component,
}

impl HostInfo {
    /// Reads the first `### ` line of the probe output.
    pub fn parse(output: &str) -> Option<HostInfo> {
        let line = output.lines().find(|line| line.starts_with("### "))?;
        let scanned = scan(line, HOST_LINE_FORMAT).ok()?;
        if scanned.count != 6 {
            return None;
        }

        let mut values = scanned.values.into_iter();
        let mut component = || -> Option<Component> {
            let name = values.next().and_then(Captured::into_text)?;
            let version = values.next().as_ref().and_then(Captured::as_unsigned)?;
            Some(Component { name, version })
        };
        Some(HostInfo {
            compiler: component()?,
            kernel: component()?,
            cpu: component()?,
        })
    }

    pub fn component(&self, aspect: HostAspect) -> &Component {
        match aspect {
            HostAspect::Compiler => &self.compiler,
            HostAspect::Kernel => &self.kernel,
            HostAspect::Cpu => &self.cpu,
        }
    }
}

#[derive(Debug, Default)]
pub struct HostState {
    /// Replaces the bundled probe program when set.
    pub probe_source: Option<PathBuf>,
    /// `None` until the probe ran; `Some(None)` when it failed.
    info: Option<Option<HostInfo>>,
    requested: Vec<HostAspect>,
}

impl HostState {
    pub fn info(&self) -> Option<&HostInfo> {
        self.info.as_ref().and_then(Option::as_ref)
    }

    /// Header macros of the requested aspects, compiler first.
    pub fn macros(&self) -> Vec<(String, String)> {
        let Some(info) = self.info() else {
            return Vec::new();
        };
        HostAspect::ALL
            .into_iter()
            .filter(|aspect| self.requested.contains(aspect))
            .map(|aspect| {
                let component = info.component(aspect);
                (
                    format!("{}{}", aspect.macro_prefix(), transform_name(&component.name)),
                    format!("0x{:x}", component.version),
                )
            })
            .collect()
    }
}

impl Session {
    /// Fingerprints one aspect of the target and requests its header macro.
    ///
    /// The probe program runs once per session.
    pub fn check_host(&mut self, aspect: HostAspect) -> Result<Option<Component>> {
        if self.host.info.is_none() {
            let outcome = match self.host.probe_source.clone() {
                Some(path) => {
                    let path = self.resolve(path);
                    self.run_file(&path, "")?
                }
                None => self.run_source(HOST_PROBE_SOURCE, "", "", "")?,
            };
            let info = if outcome.success {
                HostInfo::parse(&outcome.output)
            } else {
                None
            };
            if info.is_none() {
                warn!("Could not fingerprint the host");
                debug!("Host probe output: {}", outcome.output);
            }
            self.host.info = Some(info);
        }

        let component = self.host.info().map(|info| info.component(aspect).clone());
        if component.is_some() && !self.host.requested.contains(&aspect) {
            self.host.requested.push(aspect);
        }
        let result = component
            .as_ref()
            .map_or_else(|| "unknown".to_string(), Component::to_string);
        self.report_result(&format!("host {aspect}"), &result);
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::executor::testing::ScriptedRunner;

    fn pack_version(version: u64, revision: u64, patch: u64) -> u64 {
        (version << 24) + (revision << 16) + patch
    }

    const OUTPUT: &str = "### gcc:b020000 Linux:6010000 x86_64:0\n";

    fn session(runner: ScriptedRunner) -> Session {
        let dir = std::env::temp_dir();
        let mut session = Session::new(Config::new(dir), Box::new(runner));
        session.toolchain.compiler = Some("cc".to_string());
        session
    }

    #[test]
    fn test_pack_version() {
        assert_eq!(pack_version(11, 2, 0), 0x0b020000);
        assert_eq!(pack_version(6, 1, 12), 0x0601000c);
    }

    #[test]
    fn test_parse_host_line() {
        let info = HostInfo::parse(&format!("noise\n{OUTPUT}")).unwrap();
        assert_eq!(
            info.compiler,
            Component {
                name: "gcc".to_string(),
                version: pack_version(11, 2, 0)
            }
        );
        assert_eq!(info.kernel.name, "Linux");
        assert_eq!(info.cpu.version, 0);
    }

    #[test]
    fn test_parse_rejects_truncated_line() {
        assert_eq!(HostInfo::parse("### gcc:b020000 Linux"), None);
        assert_eq!(HostInfo::parse("hello"), None);
    }

    #[test]
    fn test_only_requested_aspects_become_macros() {
        let runner = ScriptedRunner::new(|_| true).with_probe_output(OUTPUT);
        let log = runner.log.clone();
        let mut session = session(runner);

        session.check_host(HostAspect::Kernel).unwrap();
        session.check_host(HostAspect::Compiler).unwrap();
        session.check_host(HostAspect::Kernel).unwrap();
        assert_eq!(log.borrow().len(), 1);

        assert_eq!(
            session.host.macros(),
            vec![
                ("CDETECT_COMPILER_GCC".to_string(), "0xb020000".to_string()),
                ("CDETECT_KERNEL_LINUX".to_string(), "0x6010000".to_string()),
            ]
        );
    }

    #[test]
    fn test_failed_probe_yields_no_macros() {
        let mut session = session(ScriptedRunner::new(|_| false));
        assert_eq!(session.check_host(HostAspect::Cpu).unwrap(), None);
        assert!(session.host.macros().is_empty());
    }
}
