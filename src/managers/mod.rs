pub mod backup;
pub mod filter;
pub mod history;
pub mod logging;
pub mod notification;
pub mod pipeline;
pub mod report;
pub mod restore;
pub mod retention;
