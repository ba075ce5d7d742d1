//! Per-file fix-ups for known vendor typos.
//!
//! A handful of files in the vendor distribution carry indentation that
//! is off by one space. The fix-ups are applied to character data only,
//! selected by path suffix, before the text reaches the tokenizer.

use std::borrow::Cow;
use std::path::Path;

/// (path suffix, broken text, corrected text)
const FIXUPS: &[(&str, &str, &str)] = &[
    (
        "/mrs_br.xml",
        "       UNPREDICTABLE;",
        "        UNPREDICTABLE;",
    ),
    (
        "/vcmla.xml",
        "               element",
        "                element",
    ),
    ("/vcvt_xs.xml", "     when ", "    when "),
];

/// Apply the fix-ups that match `path` to a chunk of character data.
pub fn apply<'t>(path: &Path, data: &'t str) -> Cow<'t, str> {
    let path = path.to_string_lossy();
    let mut result = Cow::Borrowed(data);
    for (suffix, from, to) in FIXUPS {
        if path.ends_with(suffix) && result.contains(from) {
            result = Cow::Owned(result.replace(from, to));
        }
    }
    result
}
