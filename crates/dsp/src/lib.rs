pub mod declutter;

pub use declutter::{Declutter, DeclutterVariant};
