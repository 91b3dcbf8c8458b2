//! Resolution rules run by the analyzer.

mod resolve_aliases;
mod resolve_functions;
mod resolve_references;
mod resolve_relations;
mod resolve_time_zone;

pub use resolve_aliases::ResolveAliases;
pub use resolve_functions::ResolveFunctions;
pub use resolve_references::ResolveReferences;
pub use resolve_relations::ResolveRelations;
pub use resolve_time_zone::ResolveTimeZone;
