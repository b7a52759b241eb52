//! Output-suppressing method wrappers

use crate::output;
use crate::plugin::Method;

/// Build a replacement for `original` that discards host stdout while it runs.
///
/// Arguments, return value and errors pass through untouched. The original is
/// captured here, once, so the caller can hand back exactly this callable on
/// restore.
pub fn suppress_output(original: Method) -> Method {
    Method::new(move |args| {
        let _quiet = output::suppress();
        original.call(args)
    })
}
