//! Class identities, registration payloads and immutable descriptions

mod definition;
mod description;
mod identity;

pub use definition::ClassDefinition;
pub use description::{ClassDescription, ClassHandle};
pub use identity::ClassId;
