pub(crate) mod graph;
pub(crate) mod metadata;
pub(crate) mod model;
pub(crate) mod resources;
pub(crate) mod runtime;
