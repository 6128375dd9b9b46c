pub mod adapters;
pub mod fs;
pub mod model;
pub mod util;
