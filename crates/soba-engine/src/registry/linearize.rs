//! Inheritance linearization
//!
//! Depth-first, post-order walk over `inheritsFrom`: parents are emitted
//! before the classes that depend on them, each class at most once. A class
//! reached again while it is still being expanded closes a cycle.

use rustc_hash::FxHashMap;

use crate::class::ClassId;
use crate::error::{EngineError, EngineResult};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Linearize the inheritance graph rooted at `root`.
///
/// `parents_of` returns the direct parents of a class in declaration order,
/// or `None` if the class is unknown. Unknown parents fail with
/// [`EngineError::UnknownParent`], an unknown root with
/// [`EngineError::NotFound`], cycles with
/// [`EngineError::CyclicInheritance`].
pub fn linearize<F>(root: &ClassId, parents_of: F) -> EngineResult<Vec<ClassId>>
where
    F: FnMut(&ClassId) -> Option<Vec<ClassId>>,
{
    let mut walker = Linearizer {
        parents_of,
        marks: FxHashMap::default(),
        path: Vec::new(),
        order: Vec::new(),
    };
    walker.visit(root, None)?;
    Ok(walker.order)
}

struct Linearizer<F> {
    parents_of: F,
    marks: FxHashMap<ClassId, Mark>,
    /// Classes currently being expanded, outermost first
    path: Vec<ClassId>,
    order: Vec<ClassId>,
}

impl<F> Linearizer<F>
where
    F: FnMut(&ClassId) -> Option<Vec<ClassId>>,
{
    fn visit(&mut self, id: &ClassId, referrer: Option<&ClassId>) -> EngineResult<()> {
        match self.marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = self.path.iter().position(|p| p == id).unwrap_or(0);
                let mut cycle = self.path[start..].to_vec();
                cycle.push(id.clone());
                return Err(EngineError::CyclicInheritance { path: cycle });
            }
            None => {}
        }

        let parents = match (self.parents_of)(id) {
            Some(parents) => parents,
            None => {
                return Err(match referrer {
                    Some(class) => EngineError::UnknownParent {
                        class: class.clone(),
                        parent: id.clone(),
                    },
                    None => EngineError::NotFound(id.clone()),
                })
            }
        };

        self.marks.insert(id.clone(), Mark::InProgress);
        self.path.push(id.clone());

        for parent in &parents {
            self.visit(parent, Some(id))?;
        }

        self.path.pop();
        self.marks.insert(id.clone(), Mark::Done);
        self.order.push(id.clone());
        Ok(())
    }
}
