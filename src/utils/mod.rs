pub mod fs;
pub mod logging;
pub mod shell;
