//! aslc-drv - Front-end Driver
//!
//! Orchestrates a run over a directory of vendor XML files:
//!
//! 1. iterate the `.xml` files in name order, skipping dotfiles and the
//!    `onebigfile.xml` aggregate;
//! 2. parse every `<pstext>` fragment of every file ([`xml`]), feeding
//!    the declarations of `shared_pseudocode.xml` into the global
//!    namespace;
//! 3. run the scope resolver over every function body the namespace
//!    holds, reporting unresolved names.
//!
//! Lexical and syntactic failures abort their fragment only; the run
//! continues and the process exit code reflects whether any fragment
//! failed.

pub mod fixups;
pub mod report;
pub mod xml;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use aslc_sem::{Namespace, Resolver};
use aslc_util::Handler;

pub use xml::{parse_file, FileOutcome, FragmentAst};

/// Totals of one run.
#[derive(Debug, Default)]
pub struct Summary {
    pub files: usize,
    pub fragments: usize,
    pub errors: usize,
}

/// The file holding the shared library declarations.
pub const SHARED_PSEUDOCODE: &str = "shared_pseudocode.xml";

/// Process every XML file under `dir`.
pub fn run(dir: &Path) -> Result<Summary> {
    let mut names = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("cannot read directory {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("cannot read directory {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !name.ends_with(".xml") || name == "onebigfile.xml" {
            continue;
        }
        names.push(name);
    }
    names.sort();

    let mut ns = Namespace::new();
    let mut summary = Summary::default();
    for name in &names {
        let path = dir.join(name);
        tracing::debug!("parsing {}", path.display());
        let outcome = xml::parse_file(&path, name == SHARED_PSEUDOCODE, &mut ns)?;
        summary.files += 1;
        summary.fragments += outcome.fragments.len();
        summary.errors += outcome.errors;
    }

    let handler = Handler::new();
    Resolver::new(&ns, &handler).process_namespace();
    for diagnostic in handler.take() {
        tracing::warn!("{diagnostic}");
    }

    Ok(summary)
}
