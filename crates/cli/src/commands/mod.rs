pub mod onboard;
pub mod research;
pub mod serve;
