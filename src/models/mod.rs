pub mod analysis;
pub mod document;
pub mod enums;
pub mod selection;
pub mod stage;

pub use analysis::*;
pub use document::*;
pub use enums::*;
pub use selection::*;
pub use stage::*;
