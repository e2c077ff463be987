//! Extension merging across represented classes

use rustc_hash::FxHashMap;

use super::{Extension, ResolvedExtension};
use crate::class::ClassId;
use crate::error::{EngineError, EngineResult};

/// Merge the own extensions of every represented class.
///
/// `represented` must be in linearized (ancestor-first) order. The result
/// keeps that order, holds each extension once even when it is reachable
/// through several classes, and rejects two distinct extensions sharing a
/// name.
pub fn merge_extensions<'a, I>(class: &ClassId, represented: I) -> EngineResult<Vec<ResolvedExtension>>
where
    I: IntoIterator<Item = (&'a ClassId, &'a [Extension])>,
{
    let mut merged: Vec<ResolvedExtension> = Vec::new();
    let mut by_name: FxHashMap<String, usize> = FxHashMap::default();

    for (declaring, own) in represented {
        for extension in own {
            if let Some(&index) = by_name.get(extension.name()) {
                let existing = &merged[index];
                if existing.extension.ptr_eq(extension) {
                    continue;
                }
                return Err(EngineError::ExtensionConflict {
                    class: class.clone(),
                    name: extension.name().to_string(),
                    existing: existing.declared_by.clone(),
                    declared_by: declaring.clone(),
                });
            }

            by_name.insert(extension.name().to_string(), merged.len());
            merged.push(ResolvedExtension {
                extension: extension.clone(),
                declared_by: declaring.clone(),
            });
        }
    }

    Ok(merged)
}
