pub mod check_in;
pub mod company;
pub mod holiday;
pub mod jobs;
pub mod team;
pub mod worker;
