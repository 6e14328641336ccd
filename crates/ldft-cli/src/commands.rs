pub mod history;
pub mod inspect;
pub mod run;
pub mod schedule;
