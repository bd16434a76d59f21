//! Text primitives shared by the detection engine: a NUL-terminated growable
//! buffer, an insertion-ordered hash map, a printf/scanf dialect working on
//! that buffer, and two pattern matchers.

pub mod dynstring;
pub mod format;
pub mod map;
pub mod regexp;
pub mod scan;
pub mod wildcard;

pub use dynstring::DynString;
pub use format::{Arg, FormatError, append_format, format};
pub use map::OrderedMap;
pub use regexp::{Regex, RegexError};
pub use scan::{Captured, ScanError, Scanned, scan};
pub use wildcard::wildcard_match;
