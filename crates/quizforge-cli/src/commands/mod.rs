pub mod categories;
pub mod history;
pub mod init;
pub mod resume;
pub mod serve;
pub mod start;
pub mod validate;
