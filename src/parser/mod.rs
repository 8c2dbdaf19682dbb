// Template parsing: source records and directive extraction

pub mod directives;
pub mod template;

pub use directives::*;
pub use template::*;
