#![allow(unused_imports)]

pub use crate::log_json;
pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};
pub use itertools::Itertools;
pub use log::{debug, error, info, trace, warn};
