pub mod cancel;
pub mod capture;
pub mod recorder;
pub mod watchdog;
