// annotator-common: wire types and pure anchoring algorithms shared by the
// annotator workspace.

pub mod anchoring;
pub mod path;
pub mod protocol;
pub mod selector;
