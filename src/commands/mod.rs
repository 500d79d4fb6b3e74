pub mod check_update;
pub mod doctor;
pub mod install;
