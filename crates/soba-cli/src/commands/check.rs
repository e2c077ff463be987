//! `soba check`: Register manifests and print the resolved classes.

use std::path::PathBuf;

use soba_engine::{ClassDescription, Runtime};

use crate::manifest::Manifest;
use crate::output::StyledOutput;

/// Arguments for the check command.
pub struct CheckArgs {
    pub manifests: Vec<PathBuf>,
    pub implicit_base: bool,
}

pub fn execute(runtime: &Runtime, args: CheckArgs, out: &mut StyledOutput) -> anyhow::Result<()> {
    let mut failures = 0usize;
    let mut registered = 0usize;

    // One runtime for all files, so later manifests may inherit earlier ones
    for path in &args.manifests {
        out.manifest(&path.display().to_string());

        let result = Manifest::from_file(path)
            .and_then(|manifest| manifest.register(runtime, args.implicit_base));
        match result {
            Ok(classes) => {
                for class in &classes {
                    print_class(runtime, class, out);
                }
                registered += classes.len();
            }
            Err(e) => {
                failures += 1;
                out.report_error(&format!("{:#}", e));
            }
        }
    }

    if failures > 0 {
        out.flush();
        anyhow::bail!("{} of {} manifests failed", failures, args.manifests.len());
    }
    out.summary(registered);
    out.flush();
    Ok(())
}

fn print_class(runtime: &Runtime, class: &ClassDescription, out: &mut StyledOutput) {
    out.class_registered(&class.id().to_string());

    let chain = runtime
        .linearize(class.id())
        .map(|ids| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        })
        .unwrap_or_else(|e| e.to_string());
    out.field("chain", &chain);

    let extensions: Vec<String> = class
        .extensions()
        .iter()
        .map(|ext| format!("{} ({})", ext.name(), ext.declared_by()))
        .collect();
    out.field_list("extensions", &extensions);

    if !class.attributes().is_empty() {
        let attributes: Vec<String> = class.attributes().keys().cloned().collect();
        out.field_list("attributes", &attributes);
    }
}
