pub mod conflict;
pub mod interval;
pub mod lifecycle;
pub mod rules;
pub mod scheduling;
