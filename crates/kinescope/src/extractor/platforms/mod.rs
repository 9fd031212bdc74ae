pub mod kinescope;
