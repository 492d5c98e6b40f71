//! Background Tasks Module
//!
//! Contains the periodic sweep trigger for the memory cache.

mod pressure_timer;

pub use pressure_timer::TimerState;

pub(crate) use pressure_timer::PressureTimer;
