pub mod session_closer;
