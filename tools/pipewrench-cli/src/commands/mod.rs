pub mod capture;
pub mod check;
pub mod recent;
pub mod screens;
pub mod watch;
pub mod windows;
