//! The coordinate model: genomes and their sticks, scale codes, the leaves
//! a tile request resolves to and the locales of objects.

pub(crate) mod leaf;
pub(crate) mod locale;
pub(crate) mod scale;
pub(crate) mod universe;

pub use leaf::*;
pub use locale::*;
pub use scale::*;
pub use universe::*;
