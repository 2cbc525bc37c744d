pub mod clock_time;
pub mod daily;
pub mod local_now;
pub mod monitor;
pub mod schedule;
pub mod status;
