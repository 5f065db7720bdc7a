pub(crate) mod config;
pub(crate) mod serve;
pub(crate) mod session;
pub(crate) mod tools;
