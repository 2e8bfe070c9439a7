pub mod check_in;
pub mod company;
pub mod holiday;
pub mod missed_check_in;
pub mod role;
pub mod team;
pub mod worker;
