pub mod credential;
pub mod session_mngr;
